use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use serde_json::{Map, Value};
use thiserror::Error;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/oauth/callback";
const DEFAULT_REPORT_CHECK_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no Google credentials: set GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET or GOOGLE_SERVICE_ACCOUNT_KEY/GOOGLE_SERVICE_ACCOUNT_JSON")]
    MissingCredentials,
    #[error("GOOGLE_CLIENT_SECRET is required when GOOGLE_CLIENT_ID is set")]
    MissingClientSecret,
    #[error("unknown REPORT_TIMEZONE '{0}'")]
    InvalidTimezone(String),
    #[error("{key} must be a positive number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("failed to read setup file {path}: {reason}")]
    SetupFile { path: String, reason: String },
}

/// Which credential source talks to Google.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleCredentials {
    OAuth {
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    },
    ServiceAccountFile(String),
    ServiceAccountJson(String),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub credentials: GoogleCredentials,
    pub data_dir: PathBuf,
    pub workspace_id: String,
    pub user_id: String,
    pub setup_file: Option<PathBuf>,
    pub report_timezone: Tz,
    pub report_check_interval: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let credentials = match (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_SERVICE_ACCOUNT_KEY"),
            get("GOOGLE_SERVICE_ACCOUNT_JSON"),
        ) {
            (Some(client_id), _, _) => GoogleCredentials::OAuth {
                client_id,
                client_secret: get("GOOGLE_CLIENT_SECRET").ok_or(ConfigError::MissingClientSecret)?,
                redirect_uri: get("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            },
            (None, Some(path), _) => GoogleCredentials::ServiceAccountFile(path),
            (None, None, Some(json)) => GoogleCredentials::ServiceAccountJson(json),
            (None, None, None) => return Err(ConfigError::MissingCredentials),
        };

        let report_timezone = match get("REPORT_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name.clone()))?,
            None => chrono_tz::UTC,
        };

        let report_check_interval = match get("REPORT_CHECK_INTERVAL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        key: "REPORT_CHECK_INTERVAL_SECS",
                        value: raw,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_REPORT_CHECK_SECS),
        };

        Ok(Self {
            credentials,
            data_dir: PathBuf::from(
                get("METRICMASTER_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            workspace_id: get("METRICMASTER_WORKSPACE_ID").unwrap_or_else(|| "default".to_string()),
            user_id: get("METRICMASTER_USER_ID").unwrap_or_else(|| "owner".to_string()),
            setup_file: get("METRICMASTER_SETUP_FILE").map(PathBuf::from),
            report_timezone,
            report_check_interval,
        })
    }

    /// Values the bot owner filled in. No setup file means an empty setup.
    pub async fn persona_setup(&self) -> Result<Map<String, Value>, ConfigError> {
        let Some(path) = &self.setup_file else {
            return Ok(Map::new());
        };
        let setup_error = |reason: String| ConfigError::SetupFile {
            path: path.display().to_string(),
            reason,
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| setup_error(e.to_string()))?;
        match serde_json::from_str::<Value>(&text).map_err(|e| setup_error(e.to_string()))? {
            Value::Object(map) => Ok(map),
            _ => Err(setup_error("expected a JSON object".to_string())),
        }
    }
}
