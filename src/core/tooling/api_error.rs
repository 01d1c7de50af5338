use thiserror::Error;

/// Failure talking to a Google REST API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API answered with a non-success HTTP status.
    #[error("{status} - {message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 and 403 both mean the credential has to be thrown away.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_statuses() {
        let forbidden = ApiError::Status {
            status: 403,
            message: "denied".to_string(),
        };
        assert!(forbidden.is_auth_failure());
        assert_eq!(forbidden.to_string(), "403 - denied");

        let server = ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!server.is_auth_failure());
        assert!(!ApiError::Transport("timeout".to_string()).is_auth_failure());
    }
}
