use super::result::ToolResult;
use super::schema::ToolDescriptorDict;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use std::time::Instant;

/// Seconds elapsed on a process-local monotonic clock.
#[must_use]
pub fn timestamp() -> f64 {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    ANCHOR.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// One inbound message unit as received from the remote session.
///
/// Any JSON object is a valid envelope. A `type` that is not a string is
/// rendered as JSON text, and a `timestamp` that is not a number is dropped.
/// All other fields are kept verbatim in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl From<Map<String, Value>> for Envelope {
    fn from(mut payload: Map<String, Value>) -> Self {
        let kind = payload.remove("type").map(|v| label(&v)).unwrap_or_default();
        let timestamp = payload.remove("timestamp").as_ref().and_then(Value::as_f64);
        Self { kind, timestamp, payload }
    }
}

/// String fields arrive untyped; anything but a string is echoed as JSON.
fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Inbound envelope classified by type.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    ListTools,
    CallTool {
        tool_name: Option<String>,
        parameters: Value,
    },
    Unknown(String),
}

impl Envelope {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            timestamp: None,
            payload: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Decode one text frame.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] if the frame is not a JSON object.
    #[allow(clippy::result_large_err)]
    pub fn decode(text: &str) -> Result<Self> {
        match serde_json::from_str(text).map_err(|e| Error::Decode(e.to_string()))? {
            Value::Object(map) => Ok(Self::from(map)),
            _ => Err(Error::Decode("expected a JSON object".to_string())),
        }
    }

    #[must_use]
    pub fn message(&self) -> InboundMessage {
        match self.kind.as_str() {
            "list_tools" => InboundMessage::ListTools,
            "call_tool" => InboundMessage::CallTool {
                tool_name: match self.payload.get("tool_name") {
                    None | Some(Value::Null) => None,
                    Some(name) => Some(label(name)),
                },
                parameters: match self.payload.get("parameters") {
                    None | Some(Value::Null) => Value::Object(Map::new()),
                    Some(other) => other.clone(),
                },
            },
            other => InboundMessage::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    ToolsAnnouncement {
        tools: Vec<ToolDescriptorDict>,
    },
    ToolsList {
        tools: Vec<ToolDescriptorDict>,
    },
    ToolResult {
        tool_name: Option<String>,
        result: ToolResult,
    },
    Error {
        error: String,
    },
}

/// One outbound message, stamped at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEnvelope {
    #[serde(flatten)]
    pub message: OutboundMessage,
    pub timestamp: f64,
}

impl OutboundEnvelope {
    #[must_use]
    pub fn new(message: OutboundMessage) -> Self {
        Self { message, timestamp: timestamp() }
    }

    #[must_use]
    pub fn tools_announcement(tools: Vec<ToolDescriptorDict>) -> Self {
        Self::new(OutboundMessage::ToolsAnnouncement { tools })
    }

    #[must_use]
    pub fn tools_list(tools: Vec<ToolDescriptorDict>) -> Self {
        Self::new(OutboundMessage::ToolsList { tools })
    }

    #[must_use]
    pub fn tool_result(tool_name: Option<String>, result: ToolResult) -> Self {
        Self::new(OutboundMessage::ToolResult { tool_name, result })
    }

    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::new(OutboundMessage::Error { error: error.into() })
    }

    /// Serialize the whole envelope before anything is written.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    #[allow(clippy::result_large_err)]
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
