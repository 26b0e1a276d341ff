use crate::dom::{Document, LiveDocument};
use crate::error::Result;

/// Detached deep copy of the live body.
///
/// The copy keeps every attribute, correlation IDs included, and shares no
/// nodes with the live tree.
pub fn clone_snapshot(live: &LiveDocument) -> Result<Document> {
    let snapshot = live.doc.deep_copy(live.doc.root())?;
    log::debug!("Snapshot holds {} elements", snapshot.count_elements());
    Ok(snapshot)
}
