use crate::dom::index::NodeIndex;
use crate::dom::node::{Document, ElementData};
use crate::error::{ExportError, Result};
use indexmap::IndexMap;
use indextree::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// A live page as returned by the capture script
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedPage {
    /// Location of the page, used to resolve relative URLs
    pub url: String,

    #[serde(default)]
    pub title: String,

    /// The `<body>` element
    pub body: CapturedNode,
}

/// A node of the captured tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapturedNode {
    Element {
        tag_name: String,

        #[serde(default)]
        attributes: IndexMap<String, String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<CapturedNode>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        render: Option<RenderInfo>,
    },
    Text {
        text: String,
    },
}

/// Presentation state of a live element at capture time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderInfo {
    /// Rendered width in CSS pixels
    #[serde(default)]
    pub width: f64,

    /// Rendered height in CSS pixels
    #[serde(default)]
    pub height: f64,

    /// Resolved values of the captured CSS properties
    #[serde(default)]
    pub style: IndexMap<String, String>,

    /// Resolved `::before` pseudo-element, when it has content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<PseudoStyle>,
}

impl RenderInfo {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Builder method: add a resolved style value
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    /// Builder method: set the `::before` content
    pub fn with_before(mut self, before: PseudoStyle) -> Self {
        self.before = Some(before);
        self
    }

    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    /// Computed `display: none` or `visibility: hidden | collapse`
    pub fn is_hidden(&self) -> bool {
        self.style_value("display") == Some("none")
            || matches!(self.style_value("visibility"), Some("hidden" | "collapse"))
    }
}

/// Resolved style of a `::before` pseudo-element
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PseudoStyle {
    /// Computed `content`, quotes included (e.g. `"\u{f007}"` wrapped in `"`)
    pub content: String,

    #[serde(default)]
    pub font_family: String,

    #[serde(default)]
    pub font_size: String,

    #[serde(default)]
    pub font_weight: String,

    #[serde(default)]
    pub color: String,
}

impl CapturedNode {
    pub fn element(tag_name: impl Into<String>) -> Self {
        CapturedNode::Element {
            tag_name: tag_name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            render: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        CapturedNode::Text { text: text.into() }
    }

    /// Builder method: add an attribute (no-op on text nodes)
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let CapturedNode::Element { attributes, .. } = &mut self {
            attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Builder method: add a child (no-op on text nodes)
    pub fn with_child(mut self, child: CapturedNode) -> Self {
        if let CapturedNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Builder method: set render info (no-op on text nodes)
    pub fn with_render(mut self, info: RenderInfo) -> Self {
        if let CapturedNode::Element { render, .. } = &mut self {
            *render = Some(info);
        }
        self
    }
}

/// The live page materialized as a document plus per-element render state.
///
/// Render state is keyed by arena node rather than stored in the tree, so
/// cloning the document yields pure markup.
#[derive(Debug, Clone)]
pub struct LiveDocument {
    pub doc: Document,
    render: HashMap<NodeId, RenderInfo>,
    url: Option<Url>,
    pub title: String,
}

impl LiveDocument {
    /// Build a live document from a captured page
    pub fn from_captured(page: CapturedPage) -> Result<Self> {
        let CapturedNode::Element {
            tag_name,
            attributes,
            children,
            render,
        } = page.body
        else {
            return Err(ExportError::CaptureFailed(
                "captured body is not an element".to_string(),
            ));
        };

        let mut doc = Document::with_root(ElementData {
            tag_name,
            attributes,
        });
        let mut render_map = HashMap::new();
        let root = doc.root();
        if let Some(info) = render {
            render_map.insert(root, info);
        }

        let mut stack: Vec<(CapturedNode, NodeId)> =
            children.into_iter().rev().map(|c| (c, root)).collect();
        while let Some((node, parent)) = stack.pop() {
            match node {
                CapturedNode::Text { text } => {
                    let id = doc.create_text(text);
                    doc.append(parent, id);
                }
                CapturedNode::Element {
                    tag_name,
                    attributes,
                    children,
                    render,
                } => {
                    let id = doc.create_element_with(ElementData {
                        tag_name,
                        attributes,
                    });
                    doc.append(parent, id);
                    if let Some(info) = render {
                        render_map.insert(id, info);
                    }
                    stack.extend(children.into_iter().rev().map(|c| (c, id)));
                }
            }
        }

        let url = Url::parse(&page.url).ok();
        if url.is_none() {
            log::debug!("Captured page URL '{}' is not absolute", page.url);
        }

        Ok(Self {
            doc,
            render: render_map,
            url,
            title: page.title,
        })
    }

    /// Parse the JSON produced by the capture script
    pub fn from_json(json: &str) -> Result<Self> {
        let page: CapturedPage = serde_json::from_str(json)
            .map_err(|e| ExportError::CaptureFailed(format!("Failed to parse page JSON: {}", e)))?;
        Self::from_captured(page)
    }

    /// Render state of a live element, if it was captured
    pub fn render(&self, node: NodeId) -> Option<&RenderInfo> {
        self.render.get(&node)
    }

    /// Page URL used as the base for relative references
    pub fn base_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Stamp correlation IDs on every element of the live tree
    pub fn index(&mut self) -> NodeIndex {
        NodeIndex::assign(&mut self.doc)
    }
}
