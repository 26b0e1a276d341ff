//! HTML and XML serialization of [`Document`] subtrees.

use crate::dom::node::{Document, NodeData};
use indextree::NodeId;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Elements that never have an end tag in HTML
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted unescaped
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

impl Document {
    /// HTML markup of the node's children
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out, false);
        }
        out
    }

    /// HTML markup of the node itself
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out, false);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String, raw_text: bool) {
        match self.data(node) {
            Some(NodeData::Text(text)) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Some(NodeData::Element(element)) => {
                out.push('<');
                out.push_str(&element.tag_name);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if is_void(&element.tag_name) {
                    return;
                }

                let raw = RAW_TEXT_ELEMENTS
                    .iter()
                    .any(|t| element.tag_name.eq_ignore_ascii_case(t));
                for child in self.children(node) {
                    self.write_html(child, out, raw);
                }

                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
            None => {}
        }
    }

    /// Standalone XML markup of the subtree, as used for SVG images.
    ///
    /// An `svg` root without an `xmlns` gets the SVG namespace added so the
    /// result is a valid image document on its own.
    pub fn to_xml(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_xml(node, &mut out, true);
        out
    }

    fn write_xml(&self, node: NodeId, out: &mut String, is_root: bool) {
        match self.data(node) {
            Some(NodeData::Text(text)) => out.push_str(&escape_text(text)),
            Some(NodeData::Element(element)) => {
                out.push('<');
                out.push_str(&element.tag_name);
                if is_root
                    && element.is_tag("svg")
                    && !element.attributes.contains_key("xmlns")
                {
                    out.push_str(" xmlns=\"");
                    out.push_str(SVG_NAMESPACE);
                    out.push('"');
                }
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }

                let children = self.children(node);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children {
                    self.write_xml(child, out, false);
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
            None => {}
        }
    }
}
