//! Cell Primitives - building live cells from descriptions.
//!
//! This module provides the construction path:
//! - [`builder`] - kind selector to host node constructor
//! - [`attach`] - reuse an existing host node or insert a new one
//! - [`cell`] - the full pipeline from description to painted cell
//!
//! # Example
//!
//! ```ignore
//! use spark_cell::{gene, MemoryDocument, Runtime};
//!
//! let runtime = Runtime::new(MemoryDocument::new());
//! let body = runtime.body()?;
//! let list = body.build(gene! {
//!     "$type" => "ul",
//!     "$components" => vec![gene! { "$type" => "li", "$text" => "one" }],
//! })?;
//! ```

pub mod attach;
pub mod builder;
mod cell;

pub use attach::attach;
pub use builder::build_host;
pub use cell::{build_cell, Placement};
