use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::auth::{AccessToken, AuthError, AuthIdentity};

/// Everything kept about one authorized user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub provider: String,
    pub identity: AuthIdentity,
    pub token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredCredential {
    fn key(&self) -> String {
        credential_key(&self.provider, &self.identity)
    }
}

fn credential_key(provider: &str, identity: &AuthIdentity) -> String {
    format!("{}:{}:{}", provider, identity.workspace_id, identity.user_id)
}

/// OAuth credentials cached in memory and mirrored to a JSON file.
pub struct TokenFileStore {
    path: PathBuf,
    credentials: DashMap<String, StoredCredential>,
}

impl TokenFileStore {
    /// Loads the file if it exists. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref().to_path_buf();
        let credentials = DashMap::new();

        if path.exists() {
            let text = fs::read_to_string(&path)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
            let stored: Vec<StoredCredential> =
                serde_json::from_str(&text).map_err(|e| AuthError::Store(e.to_string()))?;
            for credential in stored {
                credentials.insert(credential.key(), credential);
            }
            tracing::info!(path = %path.display(), count = credentials.len(), "Loaded OAuth credentials");
        }

        Ok(Self { path, credentials })
    }

    pub fn get(&self, provider: &str, identity: &AuthIdentity) -> Option<StoredCredential> {
        self.credentials
            .get(&credential_key(provider, identity))
            .map(|entry| entry.value().clone())
    }

    pub async fn put(&self, credential: StoredCredential) -> Result<(), AuthError> {
        self.credentials.insert(credential.key(), credential);
        self.persist().await
    }

    pub async fn remove(&self, provider: &str, identity: &AuthIdentity) -> Result<(), AuthError> {
        if self
            .credentials
            .remove(&credential_key(provider, identity))
            .is_some()
        {
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&self) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
        }

        let mut all: Vec<StoredCredential> = self
            .credentials
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(StoredCredential::key);

        let text =
            serde_json::to_string_pretty(&all).map_err(|e| AuthError::Store(e.to_string()))?;
        fs::write(&self.path, text)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn credential(user: &str) -> StoredCredential {
        StoredCredential {
            provider: "google".to_string(),
            identity: AuthIdentity::new("ws1", user),
            token: AccessToken::new(format!("token-{}", user), Utc::now() + Duration::hours(1)),
            refresh_token: Some("refresh".to_string()),
            scopes: vec!["https://www.googleapis.com/auth/analytics.readonly".to_string()],
        }
    }

    #[tokio::test]
    async fn test_credentials_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let store = TokenFileStore::open(&path).await.unwrap();
        assert!(store.get("google", &AuthIdentity::new("ws1", "alice")).is_none());
        store.put(credential("alice")).await.unwrap();
        store.put(credential("bob")).await.unwrap();

        let reopened = TokenFileStore::open(&path).await.unwrap();
        let alice = reopened
            .get("google", &AuthIdentity::new("ws1", "alice"))
            .unwrap();
        assert_eq!(alice.token.access_token, "token-alice");
        assert!(reopened.get("github", &AuthIdentity::new("ws1", "alice")).is_none());
    }

    #[tokio::test]
    async fn test_remove_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenFileStore::open(&path).await.unwrap();
        store.put(credential("alice")).await.unwrap();
        store
            .remove("google", &AuthIdentity::new("ws1", "alice"))
            .await
            .unwrap();

        let reopened = TokenFileStore::open(&path).await.unwrap();
        assert!(reopened.get("google", &AuthIdentity::new("ws1", "alice")).is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(matches!(
            TokenFileStore::open(&path).await,
            Err(AuthError::Store(_))
        ));
    }
}
