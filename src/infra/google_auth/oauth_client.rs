// =============================================================================
// GOOGLE OAUTH 2.0 (AUTHORIZATION CODE FLOW)
// =============================================================================
//
// 1. `start_flow` registers a random `state` and returns Google's consent URL.
// 2. The host receives the redirect and hands `code` + `state` to
//    `complete_flow`, which exchanges the code for tokens and stores them.
// 3. `get_token` serves the stored access token and refreshes it with the
//    refresh token once it is about to expire.
//
// **Environment Variables:**
// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - OAuth client from Cloud Console
// - `GOOGLE_REDIRECT_URI` - Must match the redirect registered for the client

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::core::auth::{
    AccessToken, AuthCallback, AuthError, AuthIdentity, ExternalAuth, GOOGLE_PROVIDER,
};

use super::token_file_store::{StoredCredential, TokenFileStore};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Unanswered consent requests are forgotten after this long.
const STATE_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
struct PendingFlow {
    identity: AuthIdentity,
    scopes: Vec<String>,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: String,
}

/// Only `invalid_grant` means the stored grant is gone. Other client errors are
/// flow errors; throttling and server errors are transient.
fn token_endpoint_error(status: StatusCode, body: &str) -> AuthError {
    let code = serde_json::from_str::<TokenErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_default();
    let detail = format!("token endpoint returned {}: {}", status, body);
    match status.as_u16() {
        400 | 401 if code == "invalid_grant" => AuthError::InvalidGrant(detail),
        400..=499 if status != StatusCode::TOO_MANY_REQUESTS => AuthError::Flow(detail),
        _ => AuthError::Transport(detail),
    }
}

impl TokenResponse {
    fn access_token(&self, now: DateTime<Utc>) -> AccessToken {
        AccessToken::new(self.access_token.clone(), now + Duration::seconds(self.expires_in))
    }
}

pub struct GoogleOAuthClient {
    config: OAuthClientConfig,
    client: Client,
    store: TokenFileStore,
    pending: DashMap<String, PendingFlow>,
    token_url: String,
}

impl GoogleOAuthClient {
    pub fn new(config: OAuthClientConfig, store: TokenFileStore) -> Result<Self, AuthError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self {
            config,
            client,
            store,
            pending: DashMap::new(),
            token_url: TOKEN_URL.to_string(),
        })
    }

    fn new_state() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn consent_url(&self, state: &str, scopes: &[&str]) -> Result<String, AuthError> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
        .map(String::from)
        .map_err(|e| AuthError::Flow(e.to_string()))
    }

    fn forget_stale_flows(&self, now: DateTime<Utc>) {
        self.pending
            .retain(|_, flow| now - flow.started_at < Duration::minutes(STATE_TTL_MINUTES));
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(token_endpoint_error(status, &text));
        }

        resp.json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))
    }

    async fn refresh(&self, stored: StoredCredential) -> Result<Option<AccessToken>, AuthError> {
        let Some(refresh_token) = stored.refresh_token.clone() else {
            return Ok(None);
        };

        let response = match self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .await
        {
            Ok(response) => response,
            Err(AuthError::InvalidGrant(reason)) => {
                tracing::warn!(user_id = %stored.identity.user_id, "Token refresh rejected: {}", reason);
                self.store.remove(&stored.provider, &stored.identity).await?;
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(user_id = %stored.identity.user_id, "Token refresh failed, keeping credential: {}", e);
                return Err(e);
            }
        };

        let token = response.access_token(Utc::now());
        self.store
            .put(StoredCredential {
                token: token.clone(),
                refresh_token: response.refresh_token.or(Some(refresh_token)),
                ..stored
            })
            .await?;
        tracing::debug!("Refreshed Google access token");
        Ok(Some(token))
    }
}

#[async_trait]
impl ExternalAuth for GoogleOAuthClient {
    async fn get_token(
        &self,
        provider: &str,
        identity: &AuthIdentity,
    ) -> Result<Option<AccessToken>, AuthError> {
        let Some(stored) = self.store.get(provider, identity) else {
            return Ok(None);
        };
        if stored.token.is_fresh(Utc::now()) {
            return Ok(Some(stored.token));
        }
        self.refresh(stored).await
    }

    async fn start_flow(
        &self,
        provider: &str,
        identity: &AuthIdentity,
        scopes: &[&str],
    ) -> Result<String, AuthError> {
        if provider != GOOGLE_PROVIDER {
            return Err(AuthError::Unsupported(format!(
                "OAuth provider '{}' is not configured",
                provider
            )));
        }

        let now = Utc::now();
        self.forget_stale_flows(now);

        let state = Self::new_state();
        let url = self.consent_url(&state, scopes)?;
        self.pending.insert(
            state,
            PendingFlow {
                identity: identity.clone(),
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
                started_at: now,
            },
        );
        tracing::info!(user_id = %identity.user_id, "Started Google OAuth flow");
        Ok(url)
    }
}

#[async_trait]
impl AuthCallback for GoogleOAuthClient {
    async fn complete_flow(&self, code: &str, state: &str) -> Result<AuthIdentity, AuthError> {
        let now = Utc::now();
        self.forget_stale_flows(now);

        let Some((_, flow)) = self.pending.remove(state) else {
            return Err(AuthError::Flow("unknown or expired OAuth state".to_string()));
        };

        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .await?;

        let scopes = match &response.scope {
            Some(granted) => granted.split_whitespace().map(str::to_string).collect(),
            None => flow.scopes.clone(),
        };
        self.store
            .put(StoredCredential {
                provider: GOOGLE_PROVIDER.to_string(),
                identity: flow.identity.clone(),
                token: response.access_token(now),
                refresh_token: response.refresh_token,
                scopes,
            })
            .await?;

        tracing::info!(user_id = %flow.identity.user_id, "Google OAuth flow completed");
        Ok(flow.identity)
    }
}
