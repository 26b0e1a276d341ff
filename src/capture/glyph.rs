//! Drawing icon-font glyphs onto an offscreen canvas.

use crate::browser::GlyphRequest;
use crate::capture::to_data_url;
use crate::dom::PseudoStyle;
use crate::error::{ExportError, Result};
use crate::export::ExportOptions;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use indexmap::IndexMap;
use rusttype::{Font, Scale, point};
use std::io::Cursor;
use std::path::Path;

/// Smallest canvas edge for a rasterized glyph, in pixels
pub const MIN_GLYPH_CANVAS: u32 = 16;

const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Fonts available for drawing glyphs, keyed by lowercase CSS family name
#[derive(Default)]
pub struct GlyphFonts {
    families: IndexMap<String, Font<'static>>,
    fallback: Option<Font<'static>>,
}

impl GlyphFonts {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every font file named in the options
    pub fn load(options: &ExportOptions) -> Result<Self> {
        let mut fonts = Self::empty();
        for (family, path) in &options.glyph_fonts {
            fonts.add_family(family, read_font(path)?);
        }
        if let Some(path) = &options.fallback_glyph_font {
            fonts.fallback = Some(read_font(path)?);
        }
        log::debug!("Loaded {} glyph font families", fonts.families.len());
        Ok(fonts)
    }

    pub fn add_family(&mut self, family: &str, font: Font<'static>) {
        self.families.insert(normalize_family(family), font);
    }

    pub fn set_fallback(&mut self, font: Font<'static>) {
        self.fallback = Some(font);
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.fallback.is_none()
    }

    /// First font matching a computed `font-family` list, else the fallback
    pub fn font_for(&self, family_list: &str) -> Option<&Font<'static>> {
        family_list
            .split(',')
            .map(normalize_family)
            .find_map(|family| self.families.get(&family))
            .or(self.fallback.as_ref())
    }
}

fn read_font(path: &Path) -> Result<Font<'static>> {
    let bytes = std::fs::read(path).map_err(|e| {
        ExportError::InvalidConfig(format!("Failed to read font {}: {}", path.display(), e))
    })?;
    Font::try_from_vec(bytes)
        .ok_or_else(|| ExportError::InvalidConfig(format!("{} is not a usable font", path.display())))
}

fn normalize_family(family: &str) -> String {
    family
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase()
}

/// Text to draw for a computed `content` value, if it draws anything
pub fn glyph_text(content: &str) -> Option<String> {
    let content = content.trim();
    if content.is_empty() || content == "none" || content == "normal" {
        return None;
    }
    let text: String = content.chars().filter(|&c| c != '"' && c != '\'').collect();
    if text.is_empty() { None } else { Some(text) }
}

/// CSS `font` shorthand for a computed `::before` style
pub fn font_shorthand(before: &PseudoStyle) -> String {
    let weight = match before.font_weight.trim() {
        "" => "normal",
        weight => weight,
    };
    let size = match before.font_size.trim() {
        "" => "16px",
        size => size,
    };
    format!("{} {} {}", weight, size, before.font_family.trim())
}

/// In-page drawing request for a `::before` glyph on a `size` square canvas
pub fn glyph_request(before: &PseudoStyle, text: &str, size: u32) -> GlyphRequest {
    GlyphRequest {
        text: text.to_string(),
        font: font_shorthand(before),
        color: before.color.clone(),
        size,
    }
}

/// Square canvas edge: the larger rendered dimension, at least [`MIN_GLYPH_CANVAS`]
pub fn canvas_size(width: f64, height: f64) -> u32 {
    let largest = width.max(height).round();
    if largest.is_finite() && largest > MIN_GLYPH_CANVAS as f64 {
        largest as u32
    } else {
        MIN_GLYPH_CANVAS
    }
}

/// Parse a computed `font-size` such as `"14px"`
pub fn parse_font_size(value: &str) -> f32 {
    value
        .trim()
        .trim_end_matches("px")
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE)
}

/// Parse a computed color; black when unparseable
pub fn parse_color(value: &str) -> Rgba<u8> {
    csscolorparser::parse(value)
        .map(|color| Rgba(color.to_rgba8()))
        .unwrap_or(Rgba([0, 0, 0, 255]))
}

/// Draw `text` centered on a transparent square canvas
pub fn draw_glyph(font: &Font<'static>, text: &str, font_px: f32, color: Rgba<u8>, size: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let scale = Scale::uniform(font_px);

    let advance = font
        .layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0);
    let v_metrics = font.v_metrics(scale);
    let line_height = v_metrics.ascent - v_metrics.descent;

    let x = ((size as f32 - advance) / 2.0).round() as i32;
    let y = ((size as f32 - line_height) / 2.0).round() as i32;
    draw_text_mut(&mut canvas, color, x, y, scale, font, text);
    canvas
}

/// Encode a canvas as a PNG data URI
pub fn png_data_url(canvas: RgbaImage) -> Result<String> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .map_err(|e| ExportError::ImageEncoding(e.to_string()))?;
    Ok(to_data_url("image/png", &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_text_strips_quotes() {
        assert_eq!(glyph_text("\"\u{f007}\""), Some("\u{f007}".to_string()));
        assert_eq!(glyph_text("'x'"), Some("x".to_string()));
        assert_eq!(glyph_text("\"\""), None);
        assert_eq!(glyph_text("none"), None);
        assert_eq!(glyph_text("normal"), None);
        assert_eq!(glyph_text(""), None);
    }

    #[test]
    fn test_canvas_size_has_floor() {
        assert_eq!(canvas_size(8.0, 6.0), 16);
        assert_eq!(canvas_size(24.0, 18.0), 24);
        assert_eq!(canvas_size(10.0, 31.6), 32);
        assert_eq!(canvas_size(f64::NAN, f64::NAN), 16);
    }

    #[test]
    fn test_font_shorthand() {
        let before = PseudoStyle {
            content: "\"\u{f007}\"".to_string(),
            font_family: "\"Font Awesome 6 Free\"".to_string(),
            font_size: "14px".to_string(),
            font_weight: "900".to_string(),
            color: "rgb(0, 0, 0)".to_string(),
        };
        assert_eq!(font_shorthand(&before), "900 14px \"Font Awesome 6 Free\"");
        assert_eq!(font_shorthand(&PseudoStyle::default()), "normal 16px ");
    }

    #[test]
    fn test_parse_font_size() {
        assert_eq!(parse_font_size("14px"), 14.0);
        assert_eq!(parse_font_size(" 20.5px "), 20.5);
        assert_eq!(parse_font_size("large"), DEFAULT_FONT_SIZE);
        assert_eq!(parse_font_size(""), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("rgb(255, 0, 0)"), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("#00ff00"), Rgba([0, 255, 0, 255]));
        assert_eq!(parse_color("garbage"), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_empty_fonts_match_nothing() {
        let fonts = GlyphFonts::empty();
        assert!(fonts.is_empty());
        assert!(fonts.font_for("\"Font Awesome 6 Free\", sans-serif").is_none());
    }

    #[test]
    fn test_normalize_family() {
        assert_eq!(normalize_family(" \"Font Awesome 6 Free\" "), "font awesome 6 free");
        assert_eq!(normalize_family("'Material Icons'"), "material icons");
    }

    #[test]
    fn test_png_data_url() {
        let canvas = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let url = png_data_url(canvas).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_unreadable_font_is_config_error() {
        let options = ExportOptions::default().glyph_font("Icons", "/nonexistent/icons.ttf");
        assert!(matches!(GlyphFonts::load(&options), Err(ExportError::InvalidConfig(_))));
    }
}
