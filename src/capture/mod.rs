//! Capture-and-normalize pipeline
//!
//! Turns a live page into a sanitized, self-contained snapshot:
//! index, rasterize visuals, render inline formulas, resolve images,
//! clone, inline styles, patch, sanitize. Every per-item step reports an
//! [`ItemOutcome`] so one broken icon or image never aborts the capture.

pub mod fetch;
pub mod formula;
pub mod glyph;
pub mod images;
pub mod inline;
pub mod latex;
pub mod patch;
pub mod sanitize;
pub mod snapshot;
pub mod visual;

pub use fetch::{FetchedImage, HttpFetcher, ImageFetcher};
pub use glyph::GlyphFonts;
pub use inline::InlineReport;
pub use sanitize::SanitizeReport;

use crate::browser::LivePage;
use crate::dom::{CorrelationId, Document};
use crate::error::Result;
use crate::export::{ExportConfig, ExportOptions};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Result of processing one icon, image or formula
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    Produced(T),
    Skipped { reason: String },
}

impl<T> ItemOutcome<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        ItemOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, ItemOutcome::Produced(_))
    }

    pub fn produced(self) -> Option<T> {
        match self {
            ItemOutcome::Produced(value) => Some(value),
            ItemOutcome::Skipped { .. } => None,
        }
    }
}

/// Image substitute for a visual-only element
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAsset {
    pub id: CorrelationId,
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Embedded source for an `<img>` element
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub id: CorrelationId,
    pub data_url: String,
}

/// Encode bytes as a base64 `data:` URI
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn is_data_url(src: &str) -> bool {
    src.trim_start().get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Collaborators a capture runs against
pub struct CaptureServices<'a> {
    pub page: &'a dyn LivePage,
    pub fetcher: &'a dyn ImageFetcher,
    pub fonts: &'a GlyphFonts,
}

/// Sanitized snapshot ready for the document emitter
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub doc: Document,
    pub title: String,
    pub stats: CaptureStats,
}

/// Counters collected along the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub indexed: usize,
    pub visuals: usize,
    pub formulas: usize,
    pub images_resolved: usize,
    pub images_total: usize,
    pub styled: usize,
    pub removed: usize,
}

/// Run the pipeline against a page and return the sanitized snapshot.
///
/// `progress` receives one human-readable line per stage.
pub async fn capture_snapshot(
    services: CaptureServices<'_>,
    options: &ExportOptions,
    config: ExportConfig,
    progress: &(dyn Fn(&str) + Send + Sync),
) -> Result<Snapshot> {
    let mut stats = CaptureStats::default();
    progress("Starting capture...");

    if config.auto_scroll {
        progress("Scrolling to load lazy content...");
        services.page.auto_scroll().await?;
    }

    let mut live = services.page.capture().await?;

    progress("Indexing page elements...");
    let index = live.index();
    stats.indexed = index.len();

    progress("Rasterizing formulas and icons...");
    let visuals = visual::rasterize_visuals(&live, services.page, services.fonts).await;
    stats.visuals = visuals.len();

    progress("Rendering plain-text LaTeX...");
    stats.formulas = formula::render_formulas(&mut live.doc);

    progress("Resolving images...");
    let images = images::resolve_images(&live, services.page, services.fetcher, options, progress).await;
    stats.images_total = images.len();
    let resolved: Vec<ResolvedImage> = images.into_iter().filter_map(ItemOutcome::produced).collect();
    stats.images_resolved = resolved.len();

    progress("Creating document snapshot...");
    let mut doc = snapshot::clone_snapshot(&live)?;

    progress("Inlining CSS styles...");
    let inlined = inline::inline_styles(&mut doc, &live, &index, options.style_yield_interval).await;
    stats.styled = inlined.styled;

    progress("Applying rendered images...");
    patch::apply_visual_assets(&mut doc, &visuals);
    patch::apply_resolved_images(&mut doc, &resolved);

    let report = sanitize::sanitize(&mut doc, &inlined.hidden, live.base_url());
    stats.removed = report.total();
    if report.unresolved_images_removed + report.image_placeholders > 0 {
        log::info!(
            "Dropped {} images that could not be embedded",
            report.unresolved_images_removed + report.image_placeholders
        );
    }

    log::debug!("Capture finished: {:?}", stats);
    Ok(Snapshot {
        doc,
        title: live.title,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_data_url() {
        assert_eq!(to_data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_is_data_url() {
        assert!(is_data_url("data:image/png;base64,AAAA"));
        assert!(is_data_url("DATA:image/gif;base64,R0lG"));
        assert!(!is_data_url("https://example.com/a.png"));
        assert!(!is_data_url("dat"));
        assert!(!is_data_url(""));
    }

    #[test]
    fn test_item_outcome() {
        let produced: ItemOutcome<u32> = ItemOutcome::Produced(3);
        assert!(produced.is_produced());
        assert_eq!(produced.produced(), Some(3));

        let skipped: ItemOutcome<u32> = ItemOutcome::skipped("timeout");
        assert!(!skipped.is_produced());
        assert_eq!(skipped, ItemOutcome::Skipped { reason: "timeout".to_string() });
    }
}
