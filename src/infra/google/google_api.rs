// Shared plumbing for the Google REST clients.
// Every API answers errors as `{"error": {"code", "message", "status"}}`.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::auth::AccessToken;
use crate::core::tooling::ApiError;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Builds the shared HTTP client.
pub fn http_client() -> Result<Client, ApiError> {
    Client::builder()
        .user_agent("MetricMaster/0.1")
        .build()
        .map_err(|e| ApiError::Transport(e.to_string()))
}

/// Sends a request with the caller's bearer token attached.
pub async fn send(request: RequestBuilder, token: &AccessToken) -> Result<Response, ApiError> {
    request
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))
}

/// Decodes a success body, or turns an error status into `ApiError::Status`.
pub async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason().unwrap_or("error")),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Google's message when the body carries one, otherwise the raw body.
pub fn error_message(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_google_envelope() {
        let body = r#"{"error": {"code": 403, "message": "Request had insufficient authentication scopes.", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(
            error_message(body, "Forbidden"),
            "Request had insufficient authentication scopes."
        );
        assert_eq!(error_message("upstream timeout", "Bad Gateway"), "upstream timeout");
        assert_eq!(error_message("", "Not Found"), "Not Found");
    }
}
