use super::tools::{Params, ToolRegistry};
use crate::protocol::{Envelope, InboundMessage, OutboundEnvelope, ToolResult};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Maps inbound envelopes to reply envelopes using a [`ToolRegistry`].
///
/// Every branch produces a reply; nothing a tool does can escape `process`.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The `tools_announcement` envelope sent once after connecting.
    #[must_use]
    pub fn announcement(&self) -> OutboundEnvelope {
        OutboundEnvelope::tools_announcement(self.registry.definitions())
    }

    pub async fn process(&self, envelope: Envelope) -> OutboundEnvelope {
        match envelope.message() {
            InboundMessage::ListTools => OutboundEnvelope::tools_list(self.registry.definitions()),
            InboundMessage::CallTool { tool_name, parameters } => {
                let result = self.call_tool(tool_name.as_deref().unwrap_or_default(), parameters).await;
                OutboundEnvelope::tool_result(tool_name, result)
            }
            InboundMessage::Unknown(kind) => {
                tracing::warn!(kind = %kind, "Unknown message type");
                OutboundEnvelope::error(format!("unknown message type: {kind}"))
            }
        }
    }

    /// Look up and run one tool, containing every failure as a result.
    pub async fn call_tool(&self, name: &str, parameters: Value) -> ToolResult {
        let Some(tool) = self.registry.lookup(name) else {
            tracing::warn!(tool = name, "Tool not found");
            return ToolResult::failure(format!("tool not found: {name}"));
        };
        let params: Params = match parameters {
            Value::Object(map) => map,
            _ => return ToolResult::failure("invalid parameters: expected an object"),
        };

        tracing::debug!(tool = name, "Calling tool");
        match AssertUnwindSafe(tool.execute(params)).catch_unwind().await {
            Ok(result) => {
                if let ToolResult::Failure { error } = &result {
                    tracing::warn!(tool = name, error = %error, "Tool returned a failure");
                }
                result
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(tool = name, detail = %detail, "Tool panicked");
                ToolResult::failure(format!("tool execution failed: {detail}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}
