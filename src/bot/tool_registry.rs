use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::core::tooling::{CloudTool, ToolCall, ToolHandler, ToolOutcome};

/// Routes a tool name to the integration that implements it.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
    order: Vec<&'static str>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name;
        if self.handlers.insert(name, handler).is_none() {
            self.order.push(name);
        } else {
            tracing::warn!(tool = name, "Tool registered twice, keeping the latest");
        }
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<CloudTool> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.definition())
            .collect()
    }

    pub async fn dispatch(&self, tool: &str, call: &ToolCall, model_args: Option<&Value>) -> ToolOutcome {
        match self.handlers.get(tool) {
            Some(handler) => {
                tracing::info!(tool, call_id = %call.call_id, confirmed = call.confirmed_by_human, "Tool call");
                let outcome = handler.called_by_model(call, model_args).await;
                if outcome.is_failure() {
                    tracing::debug!(tool, call_id = %call.call_id, "Tool call failed");
                }
                outcome
            }
            None => {
                tracing::warn!(tool, "Call for unknown tool");
                ToolOutcome::failure(format!(
                    "Unknown tool: {}. Available tools: {}",
                    tool,
                    self.order.join(", ")
                ))
            }
        }
    }
}
