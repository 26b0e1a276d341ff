use std::time::Duration;
use thiserror::Error;

/// Errors that abort a capture or a browser operation.
///
/// Per-item failures inside the pipeline (a single icon, image or formula)
/// never become an `ExportError`; they are reported as
/// [`ItemOutcome::Skipped`](crate::capture::ItemOutcome) instead.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Page capture failed: {0}")]
    CaptureFailed(String),

    #[error("Snapshot clone failed: {0}")]
    SnapshotFailed(String),

    #[error("Fetching {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unsupported by this page: {0}")]
    Unsupported(String),

    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),

    #[error("Document encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Document delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
