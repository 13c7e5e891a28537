use crate::bridge::ToolSpec;
use crate::protocol::ToolResult;
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const TEMPERATURE: i64 = 22;
const CONDITION: &str = "sunny";
const HUMIDITY: i64 = 65;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// City to look up.
    pub city: String,
    /// Temperature unit, `celsius` or `fahrenheit`.
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "celsius".to_string()
}

/// `get_weather`: canned weather for a city, returned after a simulated
/// lookup delay.
#[derive(Debug, Clone, Copy)]
pub struct WeatherTool {
    latency: Duration,
}

impl WeatherTool {
    #[must_use]
    pub const fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::with_latency(Duration::from_secs(1))
    }
}

#[async_trait]
impl ToolSpec for WeatherTool {
    type Args = WeatherArgs;

    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Look up the weather for a city"
    }

    async fn call(&self, args: WeatherArgs) -> Result<ToolResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let symbol: String = args.unit.chars().take(1).flat_map(char::to_uppercase).collect();
        let message = format!("{} weather: {TEMPERATURE}°{symbol}, {CONDITION}", args.city);
        Ok(ToolResult::success_with_message(
            json!({
                "city": args.city,
                "temperature": TEMPERATURE,
                "unit": args.unit,
                "condition": CONDITION,
                "humidity": HUMIDITY,
            }),
            message,
        ))
    }
}
