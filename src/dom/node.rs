use crate::dom::index::{CORRELATION_ATTR, CorrelationId};
use crate::error::{ExportError, Result};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};

/// Payload stored in every arena slot.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

/// An element's tag and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Local name as reported by the page (lowercase for HTML, case-preserving for SVG)
    pub tag_name: String,

    /// Attributes in source order
    pub attributes: IndexMap<String, String>,
}

impl ElementData {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Builder method: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attributes
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }
}

/// Arena-backed document tree.
///
/// Nodes removed from the tree stay in the arena but are flagged as removed;
/// every traversal starts from [`Document::root`], so removed or detached
/// nodes are never visited.
#[derive(Debug, Clone)]
pub struct Document {
    arena: Arena<NodeData>,
    root: NodeId,
}

impl Document {
    /// Create a document with a single root element
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self::with_root(ElementData::new(root_tag))
    }

    pub fn with_root(root: ElementData) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::Element(root));
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag_name: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeData::Element(ElementData::new(tag_name)))
    }

    pub fn create_element_with(&mut self, element: ElementData) -> NodeId {
        self.arena.new_node(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeData::Text(text.into()))
    }

    /// Append `child` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    /// Insert `new_sibling` directly before `node`
    pub fn insert_before(&mut self, node: NodeId, new_sibling: NodeId) {
        node.insert_before(new_sibling, &mut self.arena);
    }

    /// Put `replacement` where `node` was and drop `node` with its subtree
    pub fn replace(&mut self, node: NodeId, replacement: NodeId) {
        node.insert_before(replacement, &mut self.arena);
        node.remove_subtree(&mut self.arena);
    }

    /// Remove a node together with its subtree
    pub fn remove(&mut self, node: NodeId) {
        if node != self.root {
            node.remove_subtree(&mut self.arena);
        }
    }

    pub fn is_removed(&self, node: NodeId) -> bool {
        self.arena.get(node).is_none_or(|n| n.is_removed())
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, node: NodeId) -> bool {
        !self.is_removed(node) && node.ancestors(&self.arena).last() == Some(self.root)
    }

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.arena.get(node).filter(|n| !n.is_removed()).map(|n| n.get())
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.data(node) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.arena.get_mut(node).filter(|n| !n.is_removed()).map(|n| n.get_mut()) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node) {
            Some(NodeData::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag_name.as_str())
    }

    pub fn is_tag(&self, node: NodeId, tag: &str) -> bool {
        self.element(node).is_some_and(|e| e.is_tag(tag))
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_attr(&mut self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.insert(name.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        self.element_mut(node)
            .and_then(|e| e.attributes.shift_remove(name))
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_class(class_name))
    }

    /// Correlation ID stamped by the node index, if any
    pub fn correlation_id(&self, node: NodeId) -> Option<CorrelationId> {
        self.attr(node, CORRELATION_ATTR)
            .and_then(|value| value.parse().ok())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node).and_then(|n| n.parent())
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node).and_then(|n| n.next_sibling())
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        node.children(&self.arena).collect()
    }

    pub fn has_children(&self, node: NodeId) -> bool {
        self.arena.get(node).is_some_and(|n| n.first_child().is_some())
    }

    /// Node and all its descendants in document order
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        if self.is_removed(node) {
            return Vec::new();
        }
        node.descendants(&self.arena).collect()
    }

    /// All elements reachable from the root, in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.is_element(n))
            .collect()
    }

    /// All elements with the given tag, in document order
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.is_tag(n, tag))
            .collect()
    }

    /// First descendant element (excluding `node` itself) with the given tag
    pub fn find_descendant_by_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .skip(1)
            .find(|&n| self.is_tag(n, tag))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Count elements reachable from the root
    pub fn count_elements(&self) -> usize {
        self.elements().len()
    }

    /// Copy the subtree rooted at `node` into a fresh, independent document
    pub fn deep_copy(&self, node: NodeId) -> Result<Document> {
        let root = self.element(node).cloned().ok_or_else(|| {
            ExportError::SnapshotFailed("subtree root is not an attached element".to_string())
        })?;

        let mut copy = Document::with_root(root);
        let copy_root = copy.root();
        let mut stack: Vec<(NodeId, NodeId)> = node
            .children(&self.arena)
            .map(|child| (child, copy_root))
            .collect();
        stack.reverse();

        while let Some((source, target_parent)) = stack.pop() {
            let data = self.data(source).cloned().ok_or_else(|| {
                ExportError::SnapshotFailed(format!("dangling node {:?} in source tree", source))
            })?;
            let copied = copy.arena.new_node(data);
            copy.append(target_parent, copied);

            let mut children: Vec<(NodeId, NodeId)> = source
                .children(&self.arena)
                .map(|child| (child, copied))
                .collect();
            children.reverse();
            stack.extend(children);
        }

        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("body");
        let root = doc.root();
        let div = doc.create_element_with(
            ElementData::new("div").with_attribute("class", "container main"),
        );
        let text = doc.create_text("Hello");
        let span = doc.create_element("span");
        doc.append(root, div);
        doc.append(div, text);
        doc.append(div, span);
        (doc, div, text, span)
    }

    #[test]
    fn test_build_and_query() {
        let (doc, div, text, span) = sample();

        assert!(doc.is_tag(div, "DIV"));
        assert!(doc.has_class(div, "main"));
        assert!(!doc.has_class(div, "hidden"));
        assert_eq!(doc.text(text), Some("Hello"));
        assert_eq!(doc.children(div), vec![text, span]);
        assert_eq!(doc.parent(span), Some(div));
        assert_eq!(doc.count_elements(), 3);
        assert_eq!(doc.text_content(doc.root()), "Hello");
    }

    #[test]
    fn test_replace_drops_subtree() {
        let (mut doc, div, text, _span) = sample();
        let img = doc.create_element("img");
        doc.replace(div, img);

        assert!(doc.is_removed(div));
        assert!(doc.is_removed(text));
        assert!(doc.is_attached(img));
        assert_eq!(doc.children(doc.root()), vec![img]);
    }

    #[test]
    fn test_remove_never_drops_root() {
        let (mut doc, _, _, _) = sample();
        let root = doc.root();
        doc.remove(root);
        assert!(doc.is_attached(root));
    }

    #[test]
    fn test_detached_node_is_not_attached() {
        let mut doc = Document::new("body");
        let orphan = doc.create_element("p");
        assert!(!doc.is_attached(orphan));
        assert!(doc.elements().iter().all(|&n| n != orphan));
    }

    #[test]
    fn test_attributes() {
        let (mut doc, div, _, _) = sample();
        doc.set_attr(div, "id", "x");
        assert_eq!(doc.attr(div, "id"), Some("x"));
        assert_eq!(doc.remove_attr(div, "id"), Some("x".to_string()));
        assert_eq!(doc.attr(div, "id"), None);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let (mut doc, div, _, _) = sample();
        let copy = doc.deep_copy(doc.root()).unwrap();

        doc.set_attr(div, "title", "changed");
        let copied_div = copy.children(copy.root())[0];

        assert_eq!(copy.attr(copied_div, "title"), None);
        assert_eq!(copy.count_elements(), 3);
        assert_eq!(copy.text_content(copy.root()), "Hello");
    }

    #[test]
    fn test_deep_copy_preserves_order() {
        let mut doc = Document::new("body");
        let root = doc.root();
        for tag in ["h1", "p", "ul"] {
            let el = doc.create_element(tag);
            doc.append(root, el);
        }
        let copy = doc.deep_copy(root).unwrap();
        let tags: Vec<_> = copy
            .children(copy.root())
            .into_iter()
            .filter_map(|n| copy.tag_name(n).map(str::to_string))
            .collect();
        assert_eq!(tags, vec!["h1", "p", "ul"]);
    }

    #[test]
    fn test_find_descendant_skips_self() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let svg = doc.create_element("svg");
        let inner = doc.create_element("svg");
        doc.append(root, svg);
        doc.append(svg, inner);

        assert_eq!(doc.find_descendant_by_tag(svg, "svg"), Some(inner));
        assert_eq!(doc.find_descendant_by_tag(inner, "svg"), None);
    }
}
