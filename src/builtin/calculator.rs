use super::expr;
use crate::bridge::ToolSpec;
use crate::protocol::ToolResult;
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculateArgs {
    /// Arithmetic expression using numbers, `+ - * /` and parentheses.
    pub expression: String,
}

/// `calculate`: evaluate a simple arithmetic expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorTool;

#[async_trait]
impl ToolSpec for CalculatorTool {
    type Args = CalculateArgs;

    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a simple arithmetic expression"
    }

    async fn call(&self, args: CalculateArgs) -> Result<ToolResult> {
        let evaluated = expr::evaluate(&args.expression)
            .and_then(|value| value.to_json().map(|payload| (value, payload)));
        Ok(match evaluated {
            Ok((value, payload)) => {
                ToolResult::success_with_message(payload, format!("{} = {value}", args.expression))
            }
            Err(err) => ToolResult::failure(format!("calculation error: {err}")),
        })
    }
}
