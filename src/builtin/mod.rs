//! Tools shipped with the bridge binary.

mod calculator;
pub mod expr;
mod time;
mod weather;

pub use calculator::{CalculateArgs, CalculatorTool};
pub use time::{TimeArgs, TimeTool};
pub use weather::{WeatherArgs, WeatherTool};

use crate::bridge::ToolRegistry;

/// Register `get_current_time`, `get_weather` and `calculate`.
pub fn register_builtins(registry: &ToolRegistry) {
    registry.register_tool(TimeTool);
    registry.register_tool(WeatherTool::default());
    registry.register_tool(CalculatorTool);
}
