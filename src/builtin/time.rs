use crate::bridge::ToolSpec;
use crate::protocol::ToolResult;
use crate::Result;
use async_trait::async_trait;
use chrono::{FixedOffset, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TimeArgs {
    /// Timezone label, or a fixed UTC offset such as `+08:00`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// `get_current_time`: the current date and time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeTool;

#[async_trait]
impl ToolSpec for TimeTool {
    type Args = TimeArgs;

    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    async fn call(&self, args: TimeArgs) -> Result<ToolResult> {
        let now = Utc::now();
        // Labels that are not an offset are echoed back next to UTC time.
        let timestamp = args.timezone.parse::<FixedOffset>().map_or_else(
            |_| now.to_rfc3339_opts(SecondsFormat::Secs, true),
            |offset| now.with_timezone(&offset).to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        let message = format!("current time: {timestamp} ({})", args.timezone);
        Ok(ToolResult::success_with_message(
            json!({ "timestamp": timestamp, "timezone": args.timezone }),
            message,
        ))
    }
}
