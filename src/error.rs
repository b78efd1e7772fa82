//! Error types.
//!
//! Only construction paths fail. Reads, writes, flushes and reconciliation
//! passes are infallible under well-formed input; failures that happen inside
//! a flush are logged rather than propagated.

use thiserror::Error;

use crate::host::NodeId;

/// Errors raised while turning descriptions into live nodes.
#[derive(Debug, Error)]
pub enum Error {
    /// A `$virus` transform returned something other than a record.
    #[error("$virus mutations must return an object (step {step} returned {found})")]
    InvalidMutation {
        /// Zero-based position of the offending transform in the pipeline.
        step: usize,
        /// Type name of the value that was returned.
        found: &'static str,
    },

    /// The host document has no body to mount into.
    #[error("host document has no body element")]
    NoDocumentBody,

    /// The node handle does not refer to a live cell.
    #[error("node {0:?} is not a live cell")]
    UnknownNode(NodeId),

    /// `call` was used on a key whose value is not a callable.
    #[error("attribute `{0}` is not callable")]
    NotCallable(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
