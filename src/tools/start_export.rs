use crate::error::Result;
use crate::export::{ExportConfig, StartResponse};
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the start_export tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StartExportParams {
    /// Scroll through the page first so lazily loaded content is captured (default: false)
    #[serde(default, alias = "autoScroll")]
    pub auto_scroll: bool,
}

impl From<StartExportParams> for ExportConfig {
    fn from(params: StartExportParams) -> Self {
        ExportConfig::new(params.auto_scroll)
    }
}

/// Begins a capture; answers `started` or `busy` without waiting for it
#[derive(Default)]
pub struct StartExportTool;

impl Tool for StartExportTool {
    type Params = StartExportParams;

    fn name(&self) -> &str {
        "start_export"
    }

    fn description(&self) -> &str {
        "Capture the current page and export it as a Word document"
    }

    fn execute_typed(&self, params: StartExportParams, context: &mut ToolContext) -> Result<ToolResult> {
        let response = context.exporter.start_export(params.into());
        let data = serde_json::to_value(response)?;

        Ok(match response {
            StartResponse::Started => ToolResult::success_with(data),
            StartResponse::Busy => ToolResult {
                success: false,
                data: Some(data),
                error: Some("An export is already running".to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_accept_both_spellings() {
        let params: StartExportParams = serde_json::from_value(serde_json::json!({"autoScroll": true})).unwrap();
        assert!(params.auto_scroll);

        let params: StartExportParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!ExportConfig::from(params).auto_scroll);
    }
}
