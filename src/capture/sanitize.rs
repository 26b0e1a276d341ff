//! Final cleanup of the snapshot before it is handed to the encoder.

use crate::capture::images::absolutize;
use crate::capture::is_data_url;
use crate::dom::{CorrelationId, Document, NodeId, StyleDeclaration};
use std::collections::HashSet;
use url::Url;

/// Elements that are never portable to a document
const NON_PORTABLE_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "button", "input", "textarea", "select", "svg",
];

/// `rel` tokens of `<link>` elements that only matter to a browser
const RESOURCE_LINK_RELS: &[&str] = &["stylesheet", "preload", "modulepreload"];

/// Containers removed when they hold nothing but whitespace
const PRUNABLE_CONTAINERS: &[&str] = &[
    "div", "span", "p", "section", "article", "aside", "nav", "header", "footer",
];

/// What each pass removed or rewrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub non_portable: usize,
    pub hidden: usize,
    pub event_handlers: usize,
    pub image_placeholders: usize,
    pub unresolved_images_removed: usize,
    pub links: usize,
    pub empty_containers: usize,
    pub line_breaks: usize,
}

impl SanitizeReport {
    /// Elements taken out of the tree
    pub fn total(&self) -> usize {
        self.non_portable
            + self.hidden
            + self.unresolved_images_removed
            + self.empty_containers
            + self.line_breaks
    }
}

/// Run every cleanup pass in order
pub fn sanitize(doc: &mut Document, hidden: &HashSet<CorrelationId>, base: Option<&Url>) -> SanitizeReport {
    let mut report = SanitizeReport {
        non_portable: remove_non_portable(doc),
        hidden: remove_hidden(doc, hidden),
        event_handlers: strip_event_handlers(doc),
        ..Default::default()
    };

    let (placeholders, removed) = replace_unresolved_images(doc);
    report.image_placeholders = placeholders;
    report.unresolved_images_removed = removed;

    report.links = normalize_links(doc, base);
    report.empty_containers = prune_empty_containers(doc);
    report.line_breaks = collapse_line_breaks(doc);

    log::debug!("Sanitized snapshot: {:?}", report);
    report
}

fn is_non_portable(doc: &Document, node: NodeId) -> bool {
    if NON_PORTABLE_TAGS.iter().any(|tag| doc.is_tag(node, tag)) {
        return true;
    }
    if !doc.is_tag(node, "link") {
        return false;
    }
    let loads_resource = doc.attr(node, "rel").is_some_and(|rel| {
        rel.split_whitespace()
            .any(|token| RESOURCE_LINK_RELS.iter().any(|r| token.eq_ignore_ascii_case(r)))
    });
    loads_resource || doc.attr(node, "as").is_some_and(|v| v.eq_ignore_ascii_case("script"))
}

/// Remove every element matching `predicate`, outermost first
fn remove_where(doc: &mut Document, predicate: impl Fn(&Document, NodeId) -> bool) -> usize {
    let mut removed = 0;
    for node in doc.elements() {
        if node != doc.root() && doc.is_attached(node) && predicate(doc, node) {
            doc.remove(node);
            removed += 1;
        }
    }
    removed
}

/// Scripts, styles, controls, frames, resource links and leftover SVG
pub fn remove_non_portable(doc: &mut Document) -> usize {
    remove_where(doc, is_non_portable)
}

/// Elements hidden inline, hidden from assistive technology, or hidden on the live page
pub fn remove_hidden(doc: &mut Document, hidden: &HashSet<CorrelationId>) -> usize {
    remove_where(doc, |doc, node| {
        let inline_hidden = doc
            .attr(node, "style")
            .is_some_and(|style| StyleDeclaration::parse(style).hides_element());
        let aria_hidden = doc.attr(node, "aria-hidden") == Some("true");
        let live_hidden = doc.correlation_id(node).is_some_and(|id| hidden.contains(&id));
        inline_hidden || aria_hidden || live_hidden
    })
}

/// Drop `on*` attributes; returns the number of attributes removed
pub fn strip_event_handlers(doc: &mut Document) -> usize {
    let mut stripped = 0;
    for node in doc.elements() {
        let handlers: Vec<String> = doc
            .element(node)
            .map(|element| {
                element
                    .attributes
                    .keys()
                    .filter(|name| name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on")))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for name in handlers {
            doc.remove_attr(node, &name);
            stripped += 1;
        }
    }
    stripped
}

/// Text standing in for an image that could not be embedded
pub fn image_placeholder_text(alt: &str) -> String {
    format!(" [Image: {}] ", alt)
}

/// Replace images without an embedded source by their alt text, or drop them.
///
/// Returns `(placeholders, removed)`.
pub fn replace_unresolved_images(doc: &mut Document) -> (usize, usize) {
    let mut placeholders = 0;
    let mut removed = 0;

    for img in doc.elements_by_tag("img") {
        if doc.attr(img, "src").is_some_and(is_data_url) {
            continue;
        }

        let alt = doc
            .attr(img, "alt")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string);
        match alt {
            Some(alt) => {
                let span = doc.create_element("span");
                doc.set_attr(span, "style", "color:#666;font-size:0.8em");
                let text = doc.create_text(image_placeholder_text(&alt));
                doc.append(span, text);
                doc.replace(img, span);
                placeholders += 1;
            }
            None => {
                doc.remove(img);
                removed += 1;
            }
        }
    }

    if placeholders + removed > 0 {
        log::info!(
            "Cleaned up {} images that could not be embedded",
            placeholders + removed
        );
    }
    (placeholders, removed)
}

/// Absolutize `href`s and give every link the same look
pub fn normalize_links(doc: &mut Document, base: Option<&Url>) -> usize {
    let links = doc.elements_by_tag("a");
    for &link in &links {
        if let Some(absolute) = doc.attr(link, "href").and_then(|href| absolutize(href, base)) {
            doc.set_attr(link, "href", absolute);
        }

        let mut style = doc.attr(link, "style").map(StyleDeclaration::parse).unwrap_or_default();
        style.set("color", "blue");
        style.set("text-decoration", "underline");
        doc.set_attr(link, "style", style.to_string());
    }
    links.len()
}

fn is_blank_text(doc: &Document, node: NodeId) -> bool {
    doc.text(node).is_some_and(|text| text.trim().is_empty())
}

fn is_empty_container(doc: &Document, node: NodeId) -> bool {
    PRUNABLE_CONTAINERS.iter().any(|tag| doc.is_tag(node, tag))
        && doc.children(node).into_iter().all(|child| is_blank_text(doc, child))
}

/// Remove empty containers until none are left
pub fn prune_empty_containers(doc: &mut Document) -> usize {
    let mut total = 0;
    loop {
        let removed = remove_where(doc, is_empty_container);
        if removed == 0 {
            return total;
        }
        total += removed;
    }
}

/// Keep only the last of a run of `<br>`s separated by whitespace
pub fn collapse_line_breaks(doc: &mut Document) -> usize {
    let mut removed = 0;
    for br in doc.elements_by_tag("br") {
        let mut next = doc.next_sibling(br);
        while let Some(sibling) = next.filter(|&n| is_blank_text(doc, n)) {
            next = doc.next_sibling(sibling);
        }
        if next.is_some_and(|n| doc.is_tag(n, "br")) {
            doc.remove(br);
            removed += 1;
        }
    }
    removed
}
