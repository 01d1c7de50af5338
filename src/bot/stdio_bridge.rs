// =============================================================================
// HOST BRIDGE (JSON LINES OVER STDIO)
// =============================================================================
//
// The hosting agent runtime writes one JSON message per line to stdin and
// reads one JSON reply per line from stdout. Logs go to stderr.
//
// **Input:**
// {"type": "tool_call", "tool": "google_tag_manager", "call_id": "c1",
//  "confirmed": false, "args": {"op": "listAccounts"}}
// {"type": "oauth_callback", "code": "...", "state": "..."}
//
// **Output:**
// {"call_id": "c1", "status": "success", "content": "..."}
// {"call_id": "c2", "status": "needs_confirmation", "content": "...",
//  "confirmation": {"setup_key": "gtm_write", "command": "...", "explanation": "..."}}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::core::auth::AuthCallback;
use crate::core::tooling::{ConfirmationRequest, ToolCall, ToolOutcome};

use super::registry::ToolRegistry;

const OAUTH_CALL_ID: &str = "oauth_callback";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    ToolCall {
        tool: String,
        #[serde(default)]
        call_id: String,
        #[serde(default)]
        confirmed: bool,
        #[serde(default)]
        args: Option<Value>,
    },
    OauthCallback {
        code: String,
        state: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Success,
    Failure,
    NeedsConfirmation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeReply {
    pub call_id: String,
    pub status: ReplyStatus,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationRequest>,
}

impl BridgeReply {
    fn from_outcome(call_id: String, outcome: ToolOutcome) -> Self {
        let status = match &outcome {
            ToolOutcome::Success(_) => ReplyStatus::Success,
            ToolOutcome::Failure(_) => ReplyStatus::Failure,
            ToolOutcome::NeedsConfirmation(_) => ReplyStatus::NeedsConfirmation,
        };
        Self {
            call_id,
            status,
            content: outcome.text(),
            confirmation: outcome.confirmation().cloned(),
        }
    }
}

pub struct StdioBridge {
    registry: ToolRegistry,
    callback: Option<Arc<dyn AuthCallback>>,
}

impl StdioBridge {
    /// `callback` is `None` when no consent flow is configured (service account).
    pub fn new(registry: ToolRegistry, callback: Option<Arc<dyn AuthCallback>>) -> Self {
        Self { registry, callback }
    }

    /// Handles one input line. Blank lines produce no reply.
    pub async fn handle_line(&self, line: &str) -> Option<BridgeReply> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let message = match serde_json::from_str::<BridgeMessage>(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Unreadable bridge message: {}", e);
                return Some(BridgeReply::from_outcome(
                    String::new(),
                    ToolOutcome::failure(format!("Invalid message: {}", e)),
                ));
            }
        };

        Some(self.handle(message).await)
    }

    async fn handle(&self, message: BridgeMessage) -> BridgeReply {
        match message {
            BridgeMessage::ToolCall {
                tool,
                call_id,
                confirmed,
                args,
            } => {
                let mut call = ToolCall::new(call_id.clone());
                if confirmed {
                    call = call.confirmed();
                }
                let outcome = self.registry.dispatch(&tool, &call, args.as_ref()).await;
                BridgeReply::from_outcome(call_id, outcome)
            }
            BridgeMessage::OauthCallback { code, state } => {
                let outcome = match &self.callback {
                    Some(callback) => match callback.complete_flow(&code, &state).await {
                        Ok(identity) => ToolOutcome::success(format!(
                            "✅ Google account connected for user {}",
                            identity.user_id
                        )),
                        Err(e) => {
                            tracing::warn!("OAuth callback failed: {}", e);
                            ToolOutcome::failure(format!("OAuth callback failed: {}", e))
                        }
                    },
                    None => ToolOutcome::failure(
                        "OAuth callback received but no OAuth client is configured",
                    ),
                };
                BridgeReply::from_outcome(OAUTH_CALL_ID.to_string(), outcome)
            }
        }
    }

    /// Serves stdin until EOF or Ctrl-C. Calls are handled one at a time.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!(tools = ?self.registry.definitions().iter().map(|t| t.name).collect::<Vec<_>>(), "Bridge ready");

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, stopping bridge");
                    break;
                }
            };
            let Some(line) = line else {
                tracing::info!("stdin closed, stopping bridge");
                break;
            };

            if let Some(reply) = self.handle_line(&line).await {
                let mut encoded = serde_json::to_string(&reply)?;
                encoded.push('\n');
                stdout.write_all(encoded.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}
