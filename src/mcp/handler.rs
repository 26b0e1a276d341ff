use crate::browser::{BrowserSession, LaunchOptions};
use crate::export::{ExportOptions, Exporter, RecordingSink};
use crate::tools::{ToolContext, ToolRegistry, ToolResult};
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::Arc;

/// MCP server driving one exporter
#[derive(Clone)]
pub struct ExportServer {
    exporter: Exporter,
    session: Option<Arc<BrowserSession>>,
    registry: Arc<ToolRegistry>,
    events: Arc<RecordingSink>,
    tool_router: ToolRouter<Self>,
}

impl ExportServer {
    /// Serve an existing exporter; `events` must be the exporter's sink
    pub fn new(exporter: Exporter, events: Arc<RecordingSink>, session: Option<Arc<BrowserSession>>) -> Self {
        Self {
            exporter,
            session,
            registry: Arc::new(ToolRegistry::with_defaults()),
            events,
            tool_router: Self::tool_router(),
        }
    }

    /// Launch a browser and export from its active tab
    pub fn with_options(launch: LaunchOptions, options: ExportOptions) -> crate::error::Result<Self> {
        Self::with_session(BrowserSession::launch(launch)?, options)
    }

    /// Export from the active tab of an already running browser
    pub fn with_session(session: BrowserSession, options: ExportOptions) -> crate::error::Result<Self> {
        let session = Arc::new(session);
        let page = Arc::new(session.page()?);
        let events = Arc::new(RecordingSink::default());
        let exporter = Exporter::new(page, options, events.clone())?;
        Ok(Self::new(exporter, events, Some(session)))
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub(super) fn events(&self) -> &RecordingSink {
        &self.events
    }

    pub(super) fn run_tool(&self, name: &str, params: serde_json::Value) -> crate::error::Result<ToolResult> {
        let mut context = ToolContext::new(&self.exporter);
        if let Some(session) = self.session.as_deref() {
            context = context.with_session(session);
        }
        self.registry.execute(name, params, &mut context)
    }
}

#[tool_handler]
impl ServerHandler for ExportServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Exports the page open in the browser as a Word document. Call page_navigate, then \
                 page_start_export, then poll page_export_events until export_done or export_error."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
