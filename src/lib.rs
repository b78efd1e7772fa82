//! # spark-cell
//!
//! Declarative view library: plain-data descriptions in, live host trees out.
//!
//! ## Architecture
//!
//! A description ("gene") is an insertion-ordered record. Building it attaches
//! a host node and gives that node a store; reads and writes through the
//! node's [`Node`] handle are intercepted, touched nodes are collected, and a
//! single flush per frame paints whatever actually changed.
//!
//! ```text
//! gene → $virus → attach → store → accessors → paint
//!                            ↑                    │
//!                 Node::set / get ── touch ──> flush (diff, apply, $update)
//! ```
//!
//! ## Modules
//!
//! - [`value`] - Description values, callables, canonical serialization
//! - [`host`] - Host tree capability and the in-memory document
//! - [`engine`] - Cell registry, Dirty tracking, structural store
//! - [`pipeline`] - Scheduler, frame tasks, mounting
//! - [`primitives`] - Builder and attachment resolver
//! - [`renderer`] - Sequence differencer, presentation applier, reconciliation
//!
//! ## Example
//!
//! ```ignore
//! use spark_cell::{func, gene, MemoryDocument, Runtime, Value};
//!
//! let runtime = Runtime::new(MemoryDocument::new());
//! let list = runtime.body()?.build(gene! {
//!     "$type" => "ul",
//!     "_items" => vec!["a", "b"],
//!     "$update" => func!(|this, _| {
//!         let items = this.get("_items");
//!         let rows: Vec<Value> = items.as_array().into_iter().flatten()
//!             .map(|item| gene! { "$type" => "li", "$text" => item.clone() }.into())
//!             .collect();
//!         this.set("$components", rows);
//!         Value::Null
//!     }),
//! })?;
//!
//! list.modify("_items", |items| items.as_array_mut().map(|v| v.push("c".into())));
//! list.call("$update", &[])?;
//! runtime.run_until_idle();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gene;
pub mod host;
mod node;
pub mod pipeline;
pub mod primitives;
pub mod renderer;
mod runtime;
pub mod value;

// Re-export commonly used items
pub use config::Config;
pub use error::{Error, Result};
pub use host::{Host, MemoryDocument, NodeId, NodeKind, SVG_NAMESPACE};
pub use node::Node;
pub use pipeline::{FrameReport, FrameTask, MountHandle};
pub use runtime::Runtime;
pub use value::{freeze, to_json, unbind_gene, Callable, Gene, Value};
