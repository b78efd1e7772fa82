//! Touch tracking.
//!
//! Every intercepted read or write of a tracked key lands here. A touched node
//! joins the Pending-Work Set once per cycle, and the first touch of each key
//! freezes the key's pre-cycle value into the node's Dirty record.

use tracing::trace;

use crate::host::NodeId;
use crate::runtime::Runtime;
use crate::value::freeze;

use super::registry::DirtyRecord;

/// How a key was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    /// A read. Only containers are tracked, since only they can be
    /// mutated in place after being read.
    Read,
    /// A write. Always tracked.
    Write,
}

/// Record a touch of `key` on `id`.
pub fn enqueue(runtime: &Runtime, id: NodeId, key: &str, touch: Touch) {
    let tracked = runtime.cell_mut(id, |state| {
        let current = state.store.get(key);
        if touch == Touch::Read && !current.is_some_and(|v| v.is_container()) {
            return false;
        }
        let snapshot = current.map(freeze);
        state
            .dirty
            .get_or_insert_with(DirtyRecord::new)
            .entry(key.to_string())
            .or_insert(snapshot);
        true
    });

    if tracked == Some(true) {
        let first = runtime.with_scheduler(|scheduler| scheduler.insert(id));
        trace!(node = id.0, key, ?touch, first, "enqueue");
    }
}

/// Take the node's Dirty record, leaving it clear.
pub fn take(runtime: &Runtime, id: NodeId) -> Option<DirtyRecord> {
    runtime.cell_mut(id, |state| state.dirty.take()).flatten()
}

/// Keys in the node's Dirty record, in touch order.
pub fn keys(runtime: &Runtime, id: NodeId) -> Vec<String> {
    runtime
        .cell(id, |state| {
            state
                .dirty
                .as_ref()
                .map(|dirty| dirty.keys().cloned().collect())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

/// Clear the node's Dirty record.
pub fn clear(runtime: &Runtime, id: NodeId) {
    runtime.cell_mut(id, |state| state.dirty = None);
}
