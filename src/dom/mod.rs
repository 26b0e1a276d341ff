//! Document model shared by the live page and its snapshot
//!
//! This module provides:
//! - Document: arena-backed element/text tree with removal-safe traversal
//! - NodeIndex: correlation IDs linking live elements to snapshot copies
//! - LiveDocument: the captured page plus per-element render state
//! - StyleDeclaration: inline `style` attribute editing
//! - HTML / XML serialization

pub mod capture;
pub mod index;
pub mod node;
pub mod serialize;
pub mod style;

pub use capture::{CapturedNode, CapturedPage, LiveDocument, PseudoStyle, RenderInfo};
pub use index::{CORRELATION_ATTR, CorrelationId, NodeIndex, SnapshotLookup};
pub use indextree::NodeId;
pub use node::{Document, ElementData, NodeData};
pub use style::StyleDeclaration;
