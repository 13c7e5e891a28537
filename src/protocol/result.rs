use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one tool invocation.
///
/// Serialized as `{"success": true, "result": .., "message": ..}` or
/// `{"success": false, "error": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireToolResult", try_from = "WireToolResult")]
pub enum ToolResult {
    Success {
        payload: Value,
        message: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl ToolResult {
    #[must_use]
    pub fn success(payload: impl Into<Value>) -> Self {
        Self::Success { payload: payload.into(), message: None }
    }

    #[must_use]
    pub fn success_with_message(payload: impl Into<Value>, message: impl Into<String>) -> Self {
        Self::Success {
            payload: payload.into(),
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success { .. } => None,
        }
    }

    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<ToolResult> for WireToolResult {
    fn from(value: ToolResult) -> Self {
        match value {
            ToolResult::Success { payload, message } => Self {
                success: true,
                result: Some(payload),
                error: None,
                message,
            },
            ToolResult::Failure { error } => Self {
                success: false,
                result: None,
                error: Some(error),
                message: None,
            },
        }
    }
}

impl TryFrom<WireToolResult> for ToolResult {
    type Error = String;

    fn try_from(wire: WireToolResult) -> Result<Self, Self::Error> {
        match (wire.success, wire.error) {
            (true, None) => Ok(Self::Success {
                payload: wire.result.unwrap_or(Value::Null),
                message: wire.message,
            }),
            (false, Some(error)) => Ok(Self::Failure { error }),
            (true, Some(_)) => Err("successful result must not carry an error".to_string()),
            (false, None) => Err("failed result requires an error".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_flat() {
        let value = serde_json::to_value(ToolResult::success_with_message(4, "2+2 = 4")).unwrap();
        assert_eq!(value, json!({ "success": true, "result": 4, "message": "2+2 = 4" }));
    }

    #[test]
    fn failure_omits_result_and_message() {
        let value = serde_json::to_value(ToolResult::failure("boom")).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "boom" }));
    }

    #[test]
    fn rejects_success_with_error() {
        let parsed = serde_json::from_value::<ToolResult>(json!({ "success": true, "error": "x" }));
        assert!(parsed.is_err());
    }
}
