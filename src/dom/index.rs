use crate::dom::node::Document;
use indexmap::IndexMap;
use indextree::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attribute carrying the correlation ID on both the live tree and its snapshot
pub const CORRELATION_ATTR: &str = "data-docx-id";

/// Key shared between a live element and its snapshot copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(CorrelationId)
    }
}

/// Map of correlation IDs to live-tree nodes.
/// Uses IndexMap to preserve assignment (document) order
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    map: IndexMap<CorrelationId, NodeId>,

    /// Next ID to hand out; never decreases within a capture
    next_id: u64,
}

impl NodeIndex {
    pub fn new() -> Self {
        Self {
            map: IndexMap::new(),
            next_id: 0,
        }
    }

    /// Stamp every element of the document with a fresh correlation ID.
    ///
    /// IDs are assigned in document order starting at 0. Any correlation
    /// attribute left over from an earlier pass is overwritten.
    pub fn assign(doc: &mut Document) -> Self {
        let mut index = Self::new();
        for node in doc.elements() {
            let id = index.register(node);
            doc.set_attr(node, CORRELATION_ATTR, id.to_string());
        }
        log::debug!("Indexed {} elements", index.len());
        index
    }

    /// Register a node and return its assigned ID
    pub fn register(&mut self, node: NodeId) -> CorrelationId {
        let id = CorrelationId(self.next_id);
        self.map.insert(id, node);
        self.next_id += 1;
        id
    }

    /// Live node for a correlation ID
    pub fn get(&self, id: CorrelationId) -> Option<NodeId> {
        self.map.get(&id).copied()
    }

    pub fn contains(&self, id: CorrelationId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = CorrelationId> + '_ {
        self.map.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CorrelationId, NodeId)> + '_ {
        self.map.iter().map(|(id, node)| (*id, *node))
    }
}

/// One-shot lookup of correlation IDs in a (possibly mutated) snapshot.
///
/// Lookups re-check that the node is still attached and still carries the
/// same ID, so entries invalidated by earlier replacements are ignored.
pub struct SnapshotLookup {
    map: IndexMap<CorrelationId, NodeId>,
}

impl SnapshotLookup {
    pub fn build(doc: &Document) -> Self {
        let map = doc
            .elements()
            .into_iter()
            .filter_map(|node| doc.correlation_id(node).map(|id| (id, node)))
            .collect();
        Self { map }
    }

    pub fn find(&self, doc: &Document, id: CorrelationId) -> Option<NodeId> {
        self.map
            .get(&id)
            .copied()
            .filter(|&node| doc.is_attached(node) && doc.correlation_id(node) == Some(id))
    }
}
