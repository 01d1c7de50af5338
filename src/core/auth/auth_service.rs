use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::tooling::ToolOutcome;

/// Provider name every Google integration authenticates against.
pub const GOOGLE_PROVIDER: &str = "google";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors raised while fetching credentials or starting an authorization flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(String),
    #[error("authorization flow failed: {0}")]
    Flow(String),
    /// The provider revoked or expired the grant; only a new consent helps.
    #[error("authorization grant rejected: {0}")]
    InvalidGrant(String),
    #[error("token storage failed: {0}")]
    Store(String),
    #[error("{0}")]
    Unsupported(String),
}

/// Who a credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub workspace_id: String,
    pub user_id: String,
}

impl AuthIdentity {
    pub fn new(workspace_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Bearer token plus the moment it stops working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Source of OAuth credentials. Token storage and refresh live behind it.
#[async_trait]
pub trait ExternalAuth: Send + Sync {
    /// Returns the stored token for the identity, or `None` if the user never authorized.
    async fn get_token(
        &self,
        provider: &str,
        identity: &AuthIdentity,
    ) -> Result<Option<AccessToken>, AuthError>;

    /// Starts an authorization flow and returns the URL the user has to visit.
    async fn start_flow(
        &self,
        provider: &str,
        identity: &AuthIdentity,
        scopes: &[&str],
    ) -> Result<String, AuthError>;
}

#[async_trait]
impl<T: ExternalAuth + ?Sized> ExternalAuth for Arc<T> {
    async fn get_token(
        &self,
        provider: &str,
        identity: &AuthIdentity,
    ) -> Result<Option<AccessToken>, AuthError> {
        (**self).get_token(provider, identity).await
    }

    async fn start_flow(
        &self,
        provider: &str,
        identity: &AuthIdentity,
        scopes: &[&str],
    ) -> Result<String, AuthError> {
        (**self).start_flow(provider, identity, scopes).await
    }
}

/// Receives the redirect of a finished authorization flow.
#[async_trait]
pub trait AuthCallback: Send + Sync {
    async fn complete_flow(&self, code: &str, state: &str) -> Result<AuthIdentity, AuthError>;
}

/// Per-integration credential handle.
///
/// Created without a token; the first call that needs one fetches it and keeps
/// it until it gets close to expiry or the API rejects it.
pub struct GoogleSession<A: ExternalAuth> {
    auth: A,
    identity: AuthIdentity,
    scopes: &'static [&'static str],
    cached: RwLock<Option<AccessToken>>,
}

impl<A: ExternalAuth> GoogleSession<A> {
    pub fn new(auth: A, identity: AuthIdentity, scopes: &'static [&'static str]) -> Self {
        Self {
            auth,
            identity,
            scopes,
            cached: RwLock::new(None),
        }
    }

    pub fn identity(&self) -> &AuthIdentity {
        &self.identity
    }

    /// Returns a usable token, or `None` when the user has to authorize first.
    pub async fn ensure_token(&self) -> Option<AccessToken> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh(Utc::now()) {
                    return Some(token.clone());
                }
            }
        }

        match self.auth.get_token(GOOGLE_PROVIDER, &self.identity).await {
            Ok(Some(token)) if !token.is_fresh(Utc::now()) => {
                tracing::debug!(user_id = %self.identity.user_id, "Google returned an expiring token");
                None
            }
            Ok(Some(token)) => {
                tracing::info!(user_id = %self.identity.user_id, "Google session initialized");
                *self.cached.write().await = Some(token.clone());
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(user_id = %self.identity.user_id, "Failed to fetch Google token: {}", e);
                None
            }
        }
    }

    /// Drops the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    pub async fn authorization_url(&self) -> Result<String, AuthError> {
        self.auth
            .start_flow(GOOGLE_PROVIDER, &self.identity, self.scopes)
            .await
    }

    /// Reply for an operation attempted before the user authorized.
    pub async fn authorization_prompt(&self) -> ToolOutcome {
        match self.authorization_url().await {
            Ok(url) => ToolOutcome::failure(format!(
                "Not authenticated. Ask user to authorize at:\n{}\n\nThen retry this operation.",
                url
            )),
            Err(e) => ToolOutcome::failure(format!("Failed to initiate OAuth: {}", e)),
        }
    }

    /// Reply for a token the API rejected. The cached token is dropped first.
    pub async fn reauthorization_prompt(&self, service: &str, status: u16) -> ToolOutcome {
        self.invalidate().await;
        match self.authorization_url().await {
            Ok(url) => ToolOutcome::failure(format!(
                "{} authentication error: {}\n\nPlease authorize at:\n{}\n\nThen retry.",
                service, status, url
            )),
            Err(e) => ToolOutcome::failure(format!(
                "{} authentication error: {}\n\nFailed to initiate OAuth: {}",
                service, status, e
            )),
        }
    }

    /// Multi-line status block shown for `op="status"`.
    pub async fn status_text(&self, service: &str, authenticated: bool, show_workspace: bool) -> String {
        let mut text = format!("{} integration status:\n", service);
        text.push_str(&format!(
            "  Authenticated: {}\n",
            if authenticated { "✅ Yes" } else { "❌ No" }
        ));
        text.push_str(&format!("  User: {}\n", self.identity.user_id));
        if show_workspace {
            text.push_str(&format!("  Workspace: {}\n", self.identity.workspace_id));
        }
        if !authenticated {
            match self.authorization_url().await {
                Ok(url) => text.push_str(&format!(
                    "\n❌ Not authenticated. Ask user to authorize at:\n{}\n",
                    url
                )),
                Err(e) => text.push_str(&format!("\n❌ Error initiating OAuth: {}\n", e)),
            }
        }
        text
    }
}
