//! # page-docx
//!
//! Capture a live, rendered web page through Chrome DevTools Protocol (CDP)
//! and export it as a self-contained Word document.
//!
//! The capture keeps what the reader saw: icon fonts and vector formulas are
//! rasterized, plain-text LaTeX is rendered as MathML, lazy and remote images
//! are embedded, computed styles are inlined, and everything that cannot
//! travel into a word processor (scripts, controls, hidden content, empty
//! wrappers) is removed.
//!
//! ## MCP Server
//!
//! ```bash
//! cargo run --bin mcp-server --features mcp-server
//! cargo run --bin mcp-server --features mcp-server -- --headed --out-dir ./exports
//! ```
//!
//! ## Command line
//!
//! ```bash
//! cargo run --bin page-docx -- https://example.com/article --auto-scroll --out-dir ./exports
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use page_docx::{BrowserSession, ExportConfig, ExportOptions, Exporter, LaunchOptions};
//! use page_docx::export::{ChannelSink, ExportEvent};
//! use std::sync::Arc;
//!
//! # async fn run() -> page_docx::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! session.navigate("https://example.com")?;
//! session.wait_for_navigation()?;
//!
//! let (sink, mut events) = ChannelSink::new();
//! let exporter = Exporter::new(Arc::new(session.page()?), ExportOptions::default(), Arc::new(sink))?;
//! exporter.start_export(ExportConfig::new(true));
//!
//! while let Some(event) = events.recv().await {
//!     if let ExportEvent::ExportDone { location, .. } = &event {
//!         println!("written to {}", location);
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: Chrome session management and the [`LivePage`] boundary
//! - [`dom`]: arena document model, correlation index, serialization
//! - [`capture`]: the capture-and-normalize pipeline
//! - [`document`]: document shell, DOCX encoding and delivery
//! - [`export`]: the exporter, its busy gate and lifecycle events
//! - [`tools`]: command registry shared by the binaries
//! - [`mcp`]: Model Context Protocol server (requires `mcp-handler` feature)

pub mod browser;
pub mod capture;
pub mod document;
pub mod dom;
pub mod error;
pub mod export;
pub mod tools;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions, LivePage, StaticPage};
pub use capture::{Snapshot, capture_snapshot};
pub use document::{DocumentEmitter, PageSetup};
pub use error::{ExportError, Result};
pub use export::{ExportConfig, ExportEvent, ExportOptions, Exporter, StartResponse};
pub use tools::{Tool, ToolContext, ToolRegistry, ToolResult};

#[cfg(feature = "mcp-handler")]
pub use mcp::ExportServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
