use crate::document::PageSetup;
use crate::error::{ExportError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-request capture parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Scroll through the page before capturing to trigger lazy loading
    #[serde(default, alias = "autoScroll")]
    pub auto_scroll: bool,
}

impl ExportConfig {
    pub fn new(auto_scroll: bool) -> Self {
        Self { auto_scroll }
    }
}

/// Exporter-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Where finished documents are written
    pub output_dir: PathBuf,

    /// Images resolved at the same time
    pub image_concurrency: usize,

    /// Bound on each image decode or fetch attempt, in milliseconds
    pub resource_timeout_ms: u64,

    /// Style inlining yields to the scheduler after this many nodes
    pub style_yield_interval: usize,

    /// Font files for drawing icon-font glyphs off-page, keyed by CSS font
    /// family. Only consulted when the page itself cannot draw a glyph.
    pub glyph_fonts: IndexMap<String, PathBuf>,

    /// Font used when no family matches
    pub fallback_glyph_font: Option<PathBuf>,

    pub page: PageSetup,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            image_concurrency: 5,
            resource_timeout_ms: 8_000,
            style_yield_interval: 100,
            glyph_fonts: IndexMap::new(),
            fallback_glyph_font: None,
            page: PageSetup::default(),
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExportError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&raw).map_err(|e| {
            ExportError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_concurrency == 0 {
            return Err(ExportError::InvalidConfig("image_concurrency must be at least 1".to_string()));
        }
        if self.style_yield_interval == 0 {
            return Err(ExportError::InvalidConfig("style_yield_interval must be at least 1".to_string()));
        }
        if self.resource_timeout_ms == 0 {
            return Err(ExportError::InvalidConfig("resource_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Builder method: set output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method: register a glyph font for a CSS family
    pub fn glyph_font(mut self, family: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.glyph_fonts.insert(family.into(), path.into());
        self
    }

    pub fn resource_timeout(&self) -> Duration {
        Duration::from_millis(self.resource_timeout_ms)
    }
}
