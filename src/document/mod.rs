//! Document emission: shell, encoding and delivery
//!
//! The sanitized snapshot is wrapped in a fixed HTML shell, handed to a
//! [`DocumentEncoder`] together with a [`PageSetup`], named with a
//! timestamp and passed to a [`Delivery`].

pub mod delivery;
pub mod docx;
pub mod zip;

pub use delivery::{Delivery, DirectoryDelivery, MemoryDelivery};
pub use docx::{AltChunkDocx, DocumentEncoder};

use crate::capture::Snapshot;
use crate::error::Result;
use crate::export::ExportOptions;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Letter paper in twentieths of a point
const LETTER_WIDTH: u32 = 12_240;
const LETTER_HEIGHT: u32 = 15_840;

/// Half an inch in twentieths of a point
const DEFAULT_MARGIN: u32 = 720;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

/// Page margins in twips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub header: u32,
    pub footer: u32,
    pub gutter: u32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: DEFAULT_MARGIN,
            right: DEFAULT_MARGIN,
            bottom: DEFAULT_MARGIN,
            left: DEFAULT_MARGIN,
            header: DEFAULT_MARGIN,
            footer: DEFAULT_MARGIN,
            gutter: 0,
        }
    }
}

impl Margins {
    /// The same margin on all four sides
    pub fn uniform(twips: u32) -> Self {
        Self {
            top: twips,
            right: twips,
            bottom: twips,
            left: twips,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub orientation: Orientation,
    pub margins: Margins,
}

impl PageSetup {
    /// `(width, height)` in twips for the orientation
    pub fn page_size(&self) -> (u32, u32) {
        match self.orientation {
            Orientation::Portrait => (LETTER_WIDTH, LETTER_HEIGHT),
            Orientation::Landscape => (LETTER_HEIGHT, LETTER_WIDTH),
        }
    }
}

/// Wrap body markup in the fixed document shell
pub fn wrap_document(body_html: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\">\
         <style>body {{ font-family: 'SimSun', 'Arial', sans-serif; }}</style>\
         </head><body>{}</body></html>",
        body_html
    )
}

/// `Page_Export_<unix millis>.docx`
pub fn export_file_name(timestamp_millis: i64) -> String {
    format!("Page_Export_{}.docx", timestamp_millis)
}

/// A document handed to its delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivered {
    pub file_name: String,
    /// Where the delivery put it (a path for directory delivery)
    pub location: String,
    pub bytes: usize,
}

/// Final pipeline step: encode the snapshot and deliver the container
#[derive(Clone)]
pub struct DocumentEmitter {
    encoder: Arc<dyn DocumentEncoder>,
    delivery: Arc<dyn Delivery>,
    page: PageSetup,
}

impl DocumentEmitter {
    pub fn new(encoder: Arc<dyn DocumentEncoder>, delivery: Arc<dyn Delivery>, page: PageSetup) -> Self {
        Self {
            encoder,
            delivery,
            page,
        }
    }

    /// Built-in DOCX encoder writing into `options.output_dir`
    pub fn docx(options: &ExportOptions) -> Self {
        Self::new(
            Arc::new(AltChunkDocx),
            Arc::new(DirectoryDelivery::new(&options.output_dir)),
            options.page,
        )
    }

    pub fn page(&self) -> &PageSetup {
        &self.page
    }

    pub async fn emit(&self, snapshot: &Snapshot) -> Result<Delivered> {
        let html = wrap_document(&snapshot.doc.inner_html(snapshot.doc.root()));
        let bytes = self.encoder.encode(&html, &self.page)?;

        let file_name = export_file_name(chrono::Utc::now().timestamp_millis());
        let size = bytes.len();
        let location = self.delivery.deliver(&file_name, bytes).await?;
        log::info!("Delivered {} ({} bytes) to {}", file_name, size, location);

        Ok(Delivered {
            file_name,
            location,
            bytes: size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureStats;
    use crate::dom::Document;

    #[test]
    fn test_page_setup_defaults() {
        let page = PageSetup::default();
        assert_eq!(page.orientation, Orientation::Portrait);
        assert_eq!(page.page_size(), (12_240, 15_840));
        assert_eq!(page.margins.left, 720);
        assert_eq!(page.margins.header, 720);
        assert_eq!(page.margins.gutter, 0);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let page = PageSetup {
            orientation: Orientation::Landscape,
            margins: Margins::uniform(1440),
        };
        assert_eq!(page.page_size(), (15_840, 12_240));
        assert_eq!(page.margins.top, 1440);
        assert_eq!(page.margins.footer, 720);
    }

    #[test]
    fn test_page_setup_deserializes_partially() {
        let page: PageSetup = serde_json::from_str(r#"{"orientation": "landscape", "margins": {"top": 100}}"#).unwrap();
        assert_eq!(page.orientation, Orientation::Landscape);
        assert_eq!(page.margins.top, 100);
        assert_eq!(page.margins.bottom, 720);
    }

    #[test]
    fn test_wrap_document() {
        let html = wrap_document("<p>x</p>");
        assert!(html.starts_with("<!DOCTYPE html><html><head><meta charset=\"UTF-8\">"));
        assert!(html.contains("font-family: 'SimSun', 'Arial', sans-serif;"));
        assert!(html.ends_with("<body><p>x</p></body></html>"));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(1_700_000_000_123), "Page_Export_1700000000123.docx");
    }

    #[tokio::test]
    async fn test_emit_delivers_encoded_document() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let p = doc.create_element("p");
        let text = doc.create_text("Hello");
        doc.append(root, p);
        doc.append(p, text);
        let snapshot = Snapshot {
            doc,
            title: "t".to_string(),
            stats: CaptureStats::default(),
        };

        let delivery = Arc::new(MemoryDelivery::default());
        let emitter = DocumentEmitter::new(Arc::new(AltChunkDocx), delivery.clone(), PageSetup::default());
        let delivered = emitter.emit(&snapshot).await.unwrap();

        assert!(delivered.file_name.starts_with("Page_Export_"));
        assert!(delivered.file_name.ends_with(".docx"));
        let files = delivery.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, delivered.file_name);
        assert_eq!(files[0].1.len(), delivered.bytes);
        assert_eq!(&files[0].1[..2], b"PK");
    }
}
