//! Command layer shared by the MCP server and the CLI
//!
//! Each tool has typed, JSON-schema-described parameters; the
//! [`ToolRegistry`] dispatches raw JSON to them by name.

pub mod navigate;
pub mod ping;
pub mod start_export;
pub mod utils;

pub use navigate::{NavigateParams, NavigateTool};
pub use ping::{PingParams, PingTool};
pub use start_export::{StartExportParams, StartExportTool};

use crate::browser::BrowserSession;
use crate::error::{ExportError, Result};
use crate::export::Exporter;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// What a tool runs against
pub struct ToolContext<'a> {
    pub exporter: &'a Exporter,
    session: Option<&'a BrowserSession>,
}

impl<'a> ToolContext<'a> {
    pub fn new(exporter: &'a Exporter) -> Self {
        Self {
            exporter,
            session: None,
        }
    }

    pub fn with_session(mut self, session: &'a BrowserSession) -> Self {
        self.session = Some(session);
        self
    }

    /// The browser behind the page; replayed captures have none
    pub fn session(&self) -> Result<&'a BrowserSession> {
        self.session
            .ok_or_else(|| ExportError::Unsupported("this page is not backed by a browser".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn success_with(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

pub trait Tool: Send + Sync {
    type Params: DeserializeOwned + JsonSchema;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn parameters_schema(&self) -> Value {
        schemars::schema_for!(Self::Params).to_value()
    }

    fn execute_typed(&self, params: Self::Params, context: &mut ToolContext) -> Result<ToolResult>;
}

/// Object-safe view of a [`Tool`] taking raw JSON
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    fn execute(&self, params: Value, context: &mut ToolContext) -> Result<ToolResult>;
}

impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn parameters_schema(&self) -> Value {
        Tool::parameters_schema(self)
    }

    fn execute(&self, params: Value, context: &mut ToolContext) -> Result<ToolResult> {
        let typed: T::Params = serde_json::from_value(params)
            .map_err(|e| ExportError::InvalidParameters(format!("{}: {}", Tool::name(self), e)))?;
        self.execute_typed(typed, context)
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn DynTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `ping`, `start_export` and `navigate`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PingTool);
        registry.register(StartExportTool);
        registry.register(NavigateTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(Tool::name(&tool).to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynTool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn execute(&self, name: &str, params: Value, context: &mut ToolContext) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| ExportError::UnknownTool(name.to_string()))?;
        log::debug!("Executing tool {}", name);
        tool.execute(params, context)
    }
}
