//! MCP (Model Context Protocol) server for page export
//!
//! Wraps the [`tools`](crate::tools) registry as rmcp tools and exposes the
//! exporter's buffered lifecycle events for polling.

pub mod handler;
pub use handler::ExportServer;

use crate::tools::ToolResult as InternalToolResult;
use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Navigate tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavigateParams {
    /// URL of the page to export
    pub url: String,
    /// Wait for navigation to complete (default: true)
    #[serde(default = "default_true")]
    pub wait_for_load: bool,
}

/// Start export parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StartExportParams {
    /// Scroll through the page before capturing (default: false)
    #[serde(default, alias = "autoScroll")]
    pub auto_scroll: bool,
}

fn default_true() -> bool {
    true
}

fn convert_result(result: InternalToolResult) -> Result<CallToolResult, McpError> {
    if result.success {
        let text = match result.data {
            Some(data) => serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string()),
            None => "Success".to_string(),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    } else {
        let message = result.error.unwrap_or_else(|| "Unknown error".to_string());
        Ok(CallToolResult::error(vec![Content::text(message)]))
    }
}

#[tool_router]
impl ExportServer {
    #[tool(description = "Check that the export engine is alive and whether an export is running")]
    fn page_ping(&self) -> Result<CallToolResult, McpError> {
        let result = self
            .run_tool("ping", serde_json::json!({}))
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        convert_result(result)
    }

    #[tool(description = "Load a URL in the browser tab that exports are captured from")]
    fn page_navigate(&self, params: Parameters<NavigateParams>) -> Result<CallToolResult, McpError> {
        let tool_params = serde_json::json!({
            "url": params.0.url,
            "wait_for_load": params.0.wait_for_load
        });
        let result = self
            .run_tool("navigate", tool_params)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        convert_result(result)
    }

    #[tool(
        description = "Start exporting the current page as a .docx file. Returns immediately with \
                       started or busy; poll page_export_events for progress and the result"
    )]
    fn page_start_export(&self, params: Parameters<StartExportParams>) -> Result<CallToolResult, McpError> {
        let tool_params = serde_json::json!({ "auto_scroll": params.0.auto_scroll });
        let result = self
            .run_tool("start_export", tool_params)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        convert_result(result)
    }

    #[tool(description = "Return and clear the export lifecycle events received since the last call")]
    fn page_export_events(&self) -> Result<CallToolResult, McpError> {
        let events = self.events().drain();
        let text = serde_json::to_string_pretty(&events).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticPage;
    use crate::capture::GlyphFonts;
    use crate::dom::{CapturedNode, CapturedPage};
    use crate::export::{ExportEvent, Exporter, RecordingSink};
    use std::sync::Arc;

    fn server() -> ExportServer {
        let page = Arc::new(StaticPage::new(CapturedPage {
            url: "https://example.com/".to_string(),
            title: "Test".to_string(),
            body: CapturedNode::element("body"),
        }));
        let events = Arc::new(RecordingSink::default());
        let exporter = Exporter::builder(page)
            .sink(events.clone())
            .fonts(GlyphFonts::empty())
            .build()
            .unwrap();
        ExportServer::new(exporter, events, None)
    }

    #[tokio::test]
    async fn test_ping_and_events() {
        let server = server();
        let result = server.page_ping().unwrap();
        assert_ne!(result.is_error, Some(true));

        let events: Vec<ExportEvent> = serde_json::from_str(
            server.page_export_events().unwrap().content[0]
                .as_text()
                .map(|t| t.text.as_str())
                .unwrap(),
        )
        .unwrap();
        assert_eq!(events, vec![ExportEvent::EngineReady]);
        assert!(server.events().events().is_empty());
    }

    #[tokio::test]
    async fn test_server_info_advertises_tools() {
        use rmcp::ServerHandler;

        let info = server().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("page_start_export"));
    }

    #[tokio::test]
    async fn test_navigate_without_browser_fails() {
        let server = server();
        let params = Parameters(NavigateParams {
            url: "example.com".to_string(),
            wait_for_load: true,
        });
        assert!(server.page_navigate(params).is_err());
    }
}
