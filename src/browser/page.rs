use crate::dom::{CapturedPage, LiveDocument};
use crate::error::{ExportError, Result};
use async_trait::async_trait;
use headless_chrome::Tab;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The rendered page a capture runs against.
///
/// Everything the pipeline needs from the browser goes through this trait:
/// triggering lazy content, materializing the DOM with its presentation
/// state, and decoding images inside the page's own origin.
#[async_trait]
pub trait LivePage: Send + Sync {
    /// Scroll through the page so lazily loaded content is inserted
    async fn auto_scroll(&self) -> Result<()>;

    /// Materialize the current DOM together with its render state
    async fn capture(&self) -> Result<LiveDocument>;

    /// Decode an image in the page and re-encode it as a PNG data URI.
    ///
    /// Fails on timeout, decode error or a tainted (cross-origin) canvas.
    async fn decode_image(&self, src: &Url, timeout: Duration) -> Result<String>;

    /// Draw an icon-font glyph on an in-page canvas, using the fonts the
    /// page has loaded, and return it as a PNG data URI.
    async fn draw_glyph(&self, glyph: &GlyphRequest) -> Result<String>;
}

/// One glyph to draw centered on a square canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphRequest {
    pub text: String,
    /// CSS `font` shorthand, e.g. `900 14px "Font Awesome 6 Free"`
    pub font: String,
    pub color: String,
    pub size: u32,
}

/// A page living in a Chrome tab, driven over CDP
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Evaluate a script off the async executor; CDP calls block
    async fn evaluate(&self, expression: String, await_promise: bool) -> Result<Option<serde_json::Value>> {
        let tab = Arc::clone(&self.tab);
        let remote = tokio::task::spawn_blocking(move || tab.evaluate(&expression, await_promise))
            .await
            .map_err(|e| ExportError::EvaluationFailed(format!("evaluation task failed: {}", e)))?
            .map_err(|e| ExportError::EvaluationFailed(e.to_string()))?;
        Ok(remote.value)
    }
}

#[async_trait]
impl LivePage for ChromePage {
    async fn auto_scroll(&self) -> Result<()> {
        let js_code = include_str!("scroll_page.js");
        self.evaluate(js_code.to_string(), true).await?;
        Ok(())
    }

    async fn capture(&self) -> Result<LiveDocument> {
        // The script returns a JSON string
        let js_code = include_str!("capture_page.js");

        let json_value = self
            .evaluate(js_code.to_string(), false)
            .await
            .map_err(|e| ExportError::CaptureFailed(format!("Failed to execute capture script: {}", e)))?
            .ok_or_else(|| ExportError::CaptureFailed("No value returned from capture script".to_string()))?;

        let json_str: String = serde_json::from_value(json_value)
            .map_err(|e| ExportError::CaptureFailed(format!("Failed to get JSON string: {}", e)))?;

        LiveDocument::from_json(&json_str)
    }

    async fn decode_image(&self, src: &Url, timeout: Duration) -> Result<String> {
        let js_code = include_str!("decode_image.js")
            .replace("__SRC__", &serde_json::to_string(src.as_str())?)
            .replace("__TIMEOUT_MS__", &timeout.as_millis().to_string());

        // The script has its own timer; this bounds a hung CDP round trip
        let value = tokio::time::timeout(timeout + Duration::from_secs(1), self.evaluate(js_code, true))
            .await
            .map_err(|_| ExportError::Timeout(timeout))??;

        match value.as_ref().and_then(|v| v.as_str()) {
            Some(data_url) if data_url.starts_with("data:image/") => Ok(data_url.to_string()),
            _ => Err(ExportError::EvaluationFailed(format!(
                "in-page decode of {} returned no image",
                src
            ))),
        }
    }

    async fn draw_glyph(&self, glyph: &GlyphRequest) -> Result<String> {
        let js_code = include_str!("draw_glyph.js").replace("__GLYPH__", &serde_json::to_string(glyph)?);

        match self.evaluate(js_code, true).await?.as_ref().and_then(|v| v.as_str()) {
            Some(data_url) if data_url.starts_with("data:image/") => Ok(data_url.to_string()),
            _ => Err(ExportError::EvaluationFailed("in-page glyph drawing returned no image".to_string())),
        }
    }
}

/// A page replayed from a saved capture; nothing is live behind it
#[derive(Debug, Clone)]
pub struct StaticPage {
    page: CapturedPage,
}

impl StaticPage {
    pub fn new(page: CapturedPage) -> Self {
        Self { page }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let page = serde_json::from_str(json)
            .map_err(|e| ExportError::CaptureFailed(format!("Failed to parse page JSON: {}", e)))?;
        Ok(Self::new(page))
    }
}

#[async_trait]
impl LivePage for StaticPage {
    async fn auto_scroll(&self) -> Result<()> {
        Ok(())
    }

    async fn capture(&self) -> Result<LiveDocument> {
        LiveDocument::from_captured(self.page.clone())
    }

    async fn decode_image(&self, _src: &Url, _timeout: Duration) -> Result<String> {
        Err(ExportError::Unsupported("in-page image decoding".to_string()))
    }

    async fn draw_glyph(&self, _glyph: &GlyphRequest) -> Result<String> {
        Err(ExportError::Unsupported("in-page glyph drawing".to_string()))
    }
}
