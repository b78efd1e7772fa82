//! Cell Registry - per-node state for live cells.
//!
//! Manages the lifecycle of cell state keyed by host node:
//! - Registration when a description is attached to a host node
//! - Recursive release when a node leaves the tree through reconciliation
//! - Ownership lookups along the host parent chain (context inheritance)

use bitflags::bitflags;
use indexmap::{IndexMap, IndexSet};

use crate::host::NodeId;
use crate::runtime::Runtime;
use crate::value::{Gene, Value};

// =============================================================================
// Cell State
// =============================================================================

bitflags! {
    /// Transient per-cell markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// The model-update callback is running.
        const UPDATING = 1 << 0;
        /// Marked for removal by the current reconciliation pass.
        const KILL = 1 << 1;
    }
}

/// Key to pre-cycle frozen value. `None` means the key was absent.
pub type DirtyRecord = IndexMap<String, Option<String>>;

/// State of one live cell.
#[derive(Debug, Clone, Default)]
pub struct CellState {
    /// Current attribute values.
    pub store: Gene,
    /// Private keys inherited from ancestors, intercepted on this node too.
    pub inheritance: Vec<String>,
    /// Keys with an installed accessor.
    pub reactive: IndexSet<String>,
    /// Keys touched since the last flush.
    pub dirty: Option<DirtyRecord>,
    pub flags: CellFlags,
    /// Namespace URI propagated to children.
    pub namespace: Option<String>,
}

impl CellState {
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            namespace,
            ..Self::default()
        }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Register `id` as a live cell. An existing registration keeps its state
/// and only takes the new namespace. Returns `true` for a new cell.
pub fn register(runtime: &Runtime, id: NodeId, namespace: Option<String>) -> bool {
    runtime.with_cells(|cells| match cells.get_mut(&id) {
        Some(state) => {
            state.namespace = namespace;
            false
        }
        None => {
            cells.insert(id, CellState::new(namespace));
            true
        }
    })
}

/// Release the cell at `id`.
///
/// Also recursively releases every cell below it in the host tree, and
/// drops all of them from the Pending-Work Set.
pub fn release(runtime: &Runtime, id: NodeId) {
    // Children first, collected before any state changes
    let children = runtime.with_host(|host| host.children(id));
    for child in children {
        release(runtime, child);
    }

    runtime.with_cells(|cells| {
        cells.remove(&id);
    });
    runtime.with_scheduler(|scheduler| {
        scheduler.remove(id);
    });
}

// =============================================================================
// Lookups
// =============================================================================

/// Host children of `parent` that are live cells, in document order.
pub fn cell_children(runtime: &Runtime, parent: NodeId) -> Vec<NodeId> {
    let children = runtime.with_host(|host| host.children(parent));
    children
        .into_iter()
        .filter(|&child| runtime.is_cell(child))
        .collect()
}

/// Nearest strict ancestor of `id` whose store holds `key`.
pub fn owner_of(runtime: &Runtime, id: NodeId, key: &str) -> Option<NodeId> {
    let mut current = runtime.with_host(|host| host.parent(id));
    while let Some(node) = current {
        if runtime.cell(node, |state| state.has(key)).unwrap_or(false) {
            return Some(node);
        }
        current = runtime.with_host(|host| host.parent(node));
    }
    None
}
