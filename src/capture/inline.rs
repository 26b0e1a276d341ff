//! Copying resolved presentation state from live elements onto their
//! snapshot copies as inline `style` attributes.

use crate::dom::{CorrelationId, Document, LiveDocument, NodeIndex, RenderInfo, StyleDeclaration};
use std::collections::HashSet;

/// Properties carried over for every element
pub const INLINED_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "font-size",
    "font-family",
    "font-weight",
    "font-style",
    "text-align",
    "text-decoration",
    "border",
    "display",
];

/// Extra properties carried over for `<img>`
pub const IMAGE_PROPERTIES: &[&str] = &["width", "height"];

/// Values that only restate a default
const SUPPRESSED_VALUES: &[&str] = &["rgba(0, 0, 0, 0)", "transparent", "auto", "normal"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineReport {
    /// Snapshot elements that received a style
    pub styled: usize,

    /// Elements whose live counterpart was not displayed or not visible
    pub hidden: HashSet<CorrelationId>,
}

fn is_suppressed(value: &str) -> bool {
    value.is_empty() || SUPPRESSED_VALUES.contains(&value)
}

/// Inline declaration for one element
pub fn computed_declaration(render: &RenderInfo, is_image: bool) -> StyleDeclaration {
    let extra: &[&str] = if is_image { IMAGE_PROPERTIES } else { &[] };
    INLINED_PROPERTIES
        .iter()
        .chain(extra)
        .filter_map(|&property| {
            let value = render.style_value(property)?.trim();
            (!is_suppressed(value)).then_some((property, value))
        })
        .collect()
}

/// Overwrite the `style` of every correlated snapshot element.
///
/// Yields to the scheduler every `yield_every` elements. Elements without a
/// live counterpart keep their attributes untouched.
pub async fn inline_styles(
    snapshot: &mut Document,
    live: &LiveDocument,
    index: &NodeIndex,
    yield_every: usize,
) -> InlineReport {
    let yield_every = yield_every.max(1);
    let mut report = InlineReport::default();

    for (position, node) in snapshot.elements().into_iter().enumerate() {
        if position > 0 && position % yield_every == 0 {
            tokio::task::yield_now().await;
        }

        let Some(id) = snapshot.correlation_id(node) else {
            continue;
        };
        let Some(render) = index.get(id).and_then(|live_node| live.render(live_node)) else {
            continue;
        };

        if render.is_hidden() {
            report.hidden.insert(id);
        }

        let is_image = snapshot.is_tag(node, "img");
        if is_image {
            snapshot.set_attr(node, "width", (render.width.round() as i64).to_string());
            snapshot.set_attr(node, "height", (render.height.round() as i64).to_string());
        }

        let declaration = computed_declaration(render, is_image);
        snapshot.set_attr(node, "style", declaration.to_string());
        report.styled += 1;
    }

    log::debug!(
        "Inlined styles on {} elements, {} hidden",
        report.styled,
        report.hidden.len()
    );
    report
}
