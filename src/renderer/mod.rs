//! Renderer - store state onto the host tree.
//!
//! - [`diff`] - keyless LCS differencer over frozen descriptions
//! - [`apply`] - per-key presentation, first paint, init and update callbacks
//! - [`reconcile`] - children reconciliation driven by `diff`

pub mod apply;
pub mod diff;
pub mod reconcile;

pub use apply::{apply, paint, run_init, run_update};
pub use diff::{diff, lcs, Change, Common, Diff};
pub use reconcile::reconcile;
