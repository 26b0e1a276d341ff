//! Rendering LaTeX written as plain text (`$…$`, `$$…$$`, `\(…\)`, `\[…\]`)
//! into MathML, in place.

use crate::capture::latex;
use crate::dom::{Document, NodeId};
use regex::Regex;
use std::sync::LazyLock;

/// Parents whose text is never scanned
const SKIP_PARENTS: &[&str] = &["script", "style", "noscript", "textarea"];

static BLOCK_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$|\\\[(.+?)\\\]").expect("block math pattern"));

/// Inline `$…$` must not start or end with whitespace, so prices like
/// `$5 and $` are left alone; `\(…\)` may span lines.
static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([^\s$](?:[^$\n]*?[^\s$])?)\$|(?s:\\\((.+?)\\\))").expect("inline math pattern")
});

/// A piece of scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Math {
        /// The full match, delimiters included
        source: &'a str,
        latex: &'a str,
        display: bool,
    },
}

/// Split text into verbatim and math segments; block math is found first
pub fn split_formulas(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in BLOCK_MATH.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        split_inline(&text[last..whole.start()], &mut segments);
        segments.push(Segment::Math {
            source: whole.as_str(),
            latex: body.as_str(),
            display: true,
        });
        last = whole.end();
    }
    split_inline(&text[last..], &mut segments);
    segments
}

fn split_inline<'a>(text: &'a str, segments: &mut Vec<Segment<'a>>) {
    let mut last = 0;
    for caps in INLINE_MATH.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(&text[last..whole.start()]));
        }
        segments.push(Segment::Math {
            source: whole.as_str(),
            latex: body.as_str(),
            display: false,
        });
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
}

fn may_contain_math(text: &str) -> bool {
    text.contains('$') || text.contains("\\(") || text.contains("\\[")
}

/// Replace formula-bearing text nodes with a `<span>` of text and MathML.
///
/// A formula that fails to convert keeps its original text. A text node is
/// only replaced when at least one formula in it converted. Returns the
/// number of formulas rendered.
pub fn render_formulas(doc: &mut Document) -> usize {
    let candidates: Vec<(NodeId, String)> = doc
        .descendants(doc.root())
        .into_iter()
        .filter_map(|node| {
            let text = doc.text(node)?;
            if !may_contain_math(text) {
                return None;
            }
            let parent = doc.parent(node)?;
            if SKIP_PARENTS.iter().any(|tag| doc.is_tag(parent, tag)) {
                return None;
            }
            Some((node, text.to_string()))
        })
        .collect();

    let mut rendered = 0;
    for (node, text) in candidates {
        rendered += render_text_node(doc, node, &text);
    }
    if rendered > 0 {
        log::info!("Rendered {} plain-text formulas", rendered);
    }
    rendered
}

fn render_text_node(doc: &mut Document, node: NodeId, text: &str) -> usize {
    let segments = split_formulas(text);
    if !segments.iter().any(|s| matches!(s, Segment::Math { .. })) {
        return 0;
    }

    let span = doc.create_element("span");
    let mut rendered = 0;
    for segment in segments {
        let child = match segment {
            Segment::Text(verbatim) => doc.create_text(verbatim),
            Segment::Math {
                source,
                latex,
                display,
            } => match latex::render_mathml(doc, latex, display) {
                Ok(math) => {
                    rendered += 1;
                    math
                }
                Err(e) => {
                    log::debug!("Formula '{}' left as text: {}", source, e);
                    doc.create_text(source)
                }
            },
        };
        doc.append(span, child);
    }

    if rendered == 0 {
        doc.remove(span);
        return 0;
    }
    doc.replace(node, span);
    rendered
}
