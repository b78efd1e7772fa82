//! Cell Engine - per-node state and the structural store.
//!
//! The engine manages the core data structures:
//! - Registry: cell state keyed by host node, recursive release, ownership lookups
//! - Dirty: touch tracking into the Pending-Work Set and Dirty records
//! - Store: tracked and untracked writes, full rebuilds, the `$virus` pipeline
//!
//! # Architecture
//!
//! Cells are NOT host nodes. The host tree only holds presentation; each
//! attached node's model lives in a [`CellState`] next to it:
//!
//! ```text
//! NodeId(7): ul  (store={$type:"ul", _items:[..], $components:[..]}, dirty=None)
//! NodeId(9): li  (store={$text:"a"}, inheritance=["_items"], dirty={"_items": "[1,2]"})
//! ```

pub mod dirty;
pub mod registry;
pub mod store;

pub use dirty::Touch;
pub use registry::{CellFlags, CellState, DirtyRecord};
