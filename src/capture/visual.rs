//! Rasterizing visual-only elements: math containers, inline SVG and
//! icon-font glyphs.

use crate::browser::LivePage;
use crate::capture::glyph::{self, GlyphFonts};
use crate::capture::{ItemOutcome, VisualAsset, to_data_url};
use crate::dom::{LiveDocument, NodeId};

/// Elements narrower or shorter than this many pixels are treated as markers
pub const MIN_VISUAL_SIZE: f64 = 5.0;

/// How a candidate element is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualSelector {
    Class(&'static str),
    Tag(&'static str),
}

/// Math typesetting containers (MathJax v2/v3, KaTeX)
pub const MATH_SELECTORS: &[VisualSelector] = &[
    VisualSelector::Class("MathJax"),
    VisualSelector::Class("MathJax_Display"),
    VisualSelector::Tag("mjx-container"),
    VisualSelector::Class("katex"),
    VisualSelector::Class("katex-display"),
];

/// Icon conventions (Font Awesome, Material Icons, Glyphicons, generic) and inline SVG
pub const ICON_SELECTORS: &[VisualSelector] = &[
    VisualSelector::Class("fa"),
    VisualSelector::Class("fas"),
    VisualSelector::Class("far"),
    VisualSelector::Class("fal"),
    VisualSelector::Class("fab"),
    VisualSelector::Class("material-icons"),
    VisualSelector::Class("material-icons-outlined"),
    VisualSelector::Class("glyphicon"),
    VisualSelector::Class("icon"),
    VisualSelector::Class("iconfont"),
    VisualSelector::Tag("svg"),
];

impl VisualSelector {
    fn matches(self, live: &LiveDocument, node: NodeId) -> bool {
        match self {
            VisualSelector::Class(class) => live.doc.has_class(node, class),
            VisualSelector::Tag(tag) => live.doc.is_tag(node, tag),
        }
    }
}

/// Indexed candidates in document order, with negligible elements filtered out
pub fn find_candidates(live: &LiveDocument) -> Vec<NodeId> {
    live.doc
        .elements()
        .into_iter()
        .filter(|&node| {
            MATH_SELECTORS
                .iter()
                .chain(ICON_SELECTORS)
                .any(|selector| selector.matches(live, node))
        })
        .filter(|&node| {
            live.render(node)
                .is_some_and(|r| r.width > MIN_VISUAL_SIZE && r.height > MIN_VISUAL_SIZE)
        })
        .filter(|&node| live.doc.correlation_id(node).is_some())
        .collect()
}

/// Rasterize every candidate; failures contribute no asset
pub async fn rasterize_visuals(live: &LiveDocument, page: &dyn LivePage, fonts: &GlyphFonts) -> Vec<VisualAsset> {
    let candidates = find_candidates(live);
    log::info!("Found {} formulas and icons", candidates.len());

    let mut assets = Vec::new();
    for node in candidates {
        match rasterize_element(live, node, page, fonts).await {
            ItemOutcome::Produced(asset) => assets.push(asset),
            ItemOutcome::Skipped { reason } => {
                log::debug!("Visual element {:?} skipped: {}", live.doc.correlation_id(node), reason);
            }
        }
    }
    assets
}

/// Produce an image substitute for one element.
///
/// Order: the element as SVG, a descendant SVG, then its `::before` glyph.
/// Glyphs are drawn in the page with its own web fonts; the locally loaded
/// fonts only serve when the page cannot draw.
pub async fn rasterize_element(
    live: &LiveDocument,
    node: NodeId,
    page: &dyn LivePage,
    fonts: &GlyphFonts,
) -> ItemOutcome<VisualAsset> {
    let Some(id) = live.doc.correlation_id(node) else {
        return ItemOutcome::skipped("element is not indexed");
    };
    let Some(render) = live.render(node) else {
        return ItemOutcome::skipped("element has no render state");
    };
    let width = render.width.round().max(0.0) as u32;
    let height = render.height.round().max(0.0) as u32;

    let svg = if live.doc.is_tag(node, "svg") {
        Some(node)
    } else {
        live.doc.find_descendant_by_tag(node, "svg")
    };

    if let Some(svg) = svg {
        let markup = live.doc.to_xml(svg);
        return ItemOutcome::Produced(VisualAsset {
            id,
            data_url: to_data_url("image/svg+xml", markup.as_bytes()),
            width,
            height,
        });
    }

    let Some(before) = &render.before else {
        return ItemOutcome::skipped("no ::before content");
    };
    let Some(text) = glyph::glyph_text(&before.content) else {
        return ItemOutcome::skipped("empty ::before content");
    };

    let size = glyph::canvas_size(render.width, render.height);
    let glyph_asset = |data_url| VisualAsset {
        id,
        data_url,
        width: size,
        height: size,
    };

    let page_error = match page.draw_glyph(&glyph::glyph_request(before, &text, size)).await {
        Ok(data_url) => return ItemOutcome::Produced(glyph_asset(data_url)),
        Err(e) => e,
    };

    let Some(font) = fonts.font_for(&before.font_family) else {
        return ItemOutcome::skipped(format!(
            "page could not draw glyph ({}) and no local font for '{}'",
            page_error, before.font_family
        ));
    };
    let canvas = glyph::draw_glyph(
        font,
        &text,
        glyph::parse_font_size(&before.font_size),
        glyph::parse_color(&before.color),
        size,
    );
    match glyph::png_data_url(canvas) {
        Ok(data_url) => ItemOutcome::Produced(glyph_asset(data_url)),
        Err(e) => ItemOutcome::skipped(e.to_string()),
    }
}
