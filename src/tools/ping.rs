use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// No parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PingParams {}

/// Liveness probe; also reports whether an export is running
#[derive(Default)]
pub struct PingTool;

impl Tool for PingTool {
    type Params = PingParams;

    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Check that the export engine is alive"
    }

    fn execute_typed(&self, _params: PingParams, context: &mut ToolContext) -> Result<ToolResult> {
        let mut data = serde_json::to_value(context.exporter.ping())?;
        data["phase"] = serde_json::to_value(context.exporter.phase())?;
        Ok(ToolResult::success_with(data))
    }
}
