//! WordprocessingML container carrying the page as an altChunk.
//!
//! Word imports the HTML itself: `word/document.xml` holds a single
//! `w:altChunk` pointing at an MHT part, and the section properties carry
//! the page size and margins. Embedded `data:` images are moved out of the
//! markup into their own MIME parts.

use super::PageSetup;
use super::zip::ZipWriter;
use crate::error::Result;
use regex::Regex;
use std::sync::LazyLock;

/// Turns a complete HTML document into a binary container
pub trait DocumentEncoder: Send + Sync {
    fn encode(&self, html: &str, page: &PageSetup) -> Result<Vec<u8>>;
}

const MHT_BOUNDARY: &str = "----=mhtDocumentPart";
const MHT_LOCATION_ROOT: &str = "file:///C:/fake/";
const BASE64_LINE: usize = 76;

static DATA_IMAGE_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="data:([\w+./-]+);base64,([^"]+)""#).expect("valid data-uri regex"));

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="mht" ContentType="message/rfc822"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rDocument" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="htmlChunk" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk" Target="/word/afchunk.mht"/></Relationships>"#;

/// The built-in DOCX encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct AltChunkDocx;

impl DocumentEncoder for AltChunkDocx {
    fn encode(&self, html: &str, page: &PageSetup) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new();
        zip.add_file("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
        zip.add_file("_rels/.rels", PACKAGE_RELS.as_bytes())?;
        zip.add_file("word/document.xml", document_xml(page).as_bytes())?;
        zip.add_file("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes())?;
        zip.add_file("word/afchunk.mht", build_mht(html).as_bytes())?;
        zip.finish()
    }
}

/// Main document part: the altChunk reference and section properties
pub fn document_xml(page: &PageSetup) -> String {
    let (width, height) = page.page_size();
    let m = &page.margins;
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<w:body><w:altChunk r:id="htmlChunk"/><w:sectPr>"#,
            r#"<w:pgSz w:w="{}" w:h="{}" w:orient="{}"/>"#,
            r#"<w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="{}" w:footer="{}" w:gutter="{}"/>"#,
            r#"</w:sectPr></w:body></w:document>"#
        ),
        width,
        height,
        page.orientation.as_str(),
        m.top,
        m.right,
        m.bottom,
        m.left,
        m.header,
        m.footer,
        m.gutter
    )
}

struct ImagePart {
    content_type: String,
    location: String,
    base64: String,
}

/// File extension for an image MIME type: `image/svg+xml` gives `svg`
fn image_extension(content_type: &str) -> &str {
    let subtype = content_type.split_once('/').map_or(content_type, |(_, sub)| sub);
    subtype.split('+').next().unwrap_or(subtype)
}

/// Move `data:` image sources out of the markup into separate parts
fn extract_images(html: &str) -> (String, Vec<ImagePart>) {
    let mut parts = Vec::new();
    let rewritten = DATA_IMAGE_SRC.replace_all(html, |caps: &regex::Captures| {
        let content_type = caps[1].to_string();
        let location = format!("{}image{}.{}", MHT_LOCATION_ROOT, parts.len(), image_extension(&content_type));
        let replacement = format!("src=\"{}\"", location);
        parts.push(ImagePart {
            content_type,
            location,
            base64: caps[2].chars().filter(|c| !c.is_whitespace()).collect(),
        });
        replacement
    });
    (rewritten.into_owned(), parts)
}

fn wrap_lines(data: &str, width: usize) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / width * 2);
    let mut rest = data;
    while rest.len() > width {
        let (line, tail) = rest.split_at(width);
        out.push_str(line);
        out.push_str("\r\n");
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// MIME HTML archive with the document as its first part
pub fn build_mht(html: &str) -> String {
    let (markup, images) = extract_images(html);
    let markup = markup.replace('=', "=3D");

    let mut mht = String::with_capacity(markup.len() + images.iter().map(|i| i.base64.len() + 256).sum::<usize>());
    mht.push_str("MIME-Version: 1.0\r\n");
    mht.push_str("Content-Type: multipart/related;\r\n");
    mht.push_str("    type=\"text/html\";\r\n");
    mht.push_str(&format!("    boundary=\"{}\"\r\n\r\n", MHT_BOUNDARY));

    mht.push_str(&format!("--{}\r\n", MHT_BOUNDARY));
    mht.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
    mht.push_str("Content-Transfer-Encoding: quoted-printable\r\n");
    mht.push_str(&format!("Content-Location: {}document.html\r\n\r\n", MHT_LOCATION_ROOT));
    mht.push_str(&markup);
    mht.push_str("\r\n\r\n");

    for image in &images {
        mht.push_str(&format!("--{}\r\n", MHT_BOUNDARY));
        mht.push_str(&format!("Content-Type: {}\r\n", image.content_type));
        mht.push_str("Content-Transfer-Encoding: base64\r\n");
        mht.push_str(&format!("Content-Location: {}\r\n\r\n", image.location));
        mht.push_str(&wrap_lines(&image.base64, BASE64_LINE));
        mht.push_str("\r\n\r\n");
    }

    mht.push_str(&format!("--{}--\r\n", MHT_BOUNDARY));
    mht
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::zip::tests::read_entries;
    use crate::document::{Margins, Orientation};

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/png"), "png");
        assert_eq!(image_extension("image/svg+xml"), "svg");
        assert_eq!(image_extension("image/jpeg"), "jpeg");
    }

    #[test]
    fn test_document_xml_section_properties() {
        let xml = document_xml(&PageSetup::default());
        assert!(xml.contains(r#"<w:altChunk r:id="htmlChunk"/>"#));
        assert!(xml.contains(r#"<w:pgSz w:w="12240" w:h="15840" w:orient="portrait"/>"#));
        assert!(xml.contains(
            r#"<w:pgMar w:top="720" w:right="720" w:bottom="720" w:left="720" w:header="720" w:footer="720" w:gutter="0"/>"#
        ));

        let landscape = PageSetup {
            orientation: Orientation::Landscape,
            margins: Margins::default(),
        };
        assert!(document_xml(&landscape).contains(r#"<w:pgSz w:w="15840" w:h="12240" w:orient="landscape"/>"#));
    }

    #[test]
    fn test_mht_moves_images_into_parts() {
        let payload = "A".repeat(200);
        let html = format!(
            r#"<p class="x"><img src="data:image/png;base64,{}" width="3"><img src="data:image/svg+xml;base64,PHN2Zz4="></p>"#,
            payload
        );
        let mht = build_mht(&html);

        assert!(mht.contains(r#"boundary="----=mhtDocumentPart""#));
        assert!(mht.contains(r#"<p class=3D"x"><img src=3D"file:///C:/fake/image0.png" width=3D"3">"#));
        assert!(mht.contains(r#"<img src=3D"file:///C:/fake/image1.svg">"#));
        assert!(!mht.contains("data:image"));

        assert!(mht.contains("Content-Type: image/png\r\nContent-Transfer-Encoding: base64\r\nContent-Location: file:///C:/fake/image0.png"));
        assert!(mht.contains("Content-Type: image/svg+xml\r\n"));
        // 200 base64 chars wrap into 76 + 76 + 48
        assert!(mht.contains(&format!("{}\r\n{}\r\n{}\r\n", "A".repeat(76), "A".repeat(76), "A".repeat(48))));
        assert!(mht.trim_end().ends_with("------=mhtDocumentPart--"));
    }

    #[test]
    fn test_mht_without_images() {
        let mht = build_mht("<p>a = b</p>");
        assert!(mht.contains("<p>a =3D b</p>"));
        assert_eq!(mht.matches("------=mhtDocumentPart\r\n").count(), 1);
    }

    #[test]
    fn test_encode_produces_package() {
        let archive = AltChunkDocx
            .encode("<!DOCTYPE html><html><body><p>Hi</p></body></html>", &PageSetup::default())
            .unwrap();
        let entries = read_entries(&archive);
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/document.xml",
                "word/_rels/document.xml.rels",
                "word/afchunk.mht",
            ]
        );

        let mht = String::from_utf8(entries[4].1.clone()).unwrap();
        assert!(mht.contains("<p>Hi</p>"));
        let rels = String::from_utf8(entries[3].1.clone()).unwrap();
        assert!(rels.contains(r#"Target="/word/afchunk.mht""#));
    }
}
