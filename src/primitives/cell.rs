//! Cell construction - description to live node.
//!
//! ```text
//! infect ($virus) -> attach (resolve | add) -> store build -> accessors -> paint
//! ```

use tracing::debug;

use crate::engine::{registry, store};
use crate::error::Result;
use crate::host::NodeId;
use crate::pipeline::scheduler;
use crate::renderer::apply;
use crate::runtime::Runtime;
use crate::value::Gene;

use super::attach::attach;
use super::builder::normalize_text;

/// Where and how a description is attached.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// Private keys inherited from ancestors.
    pub inheritance: Vec<String>,
    /// Sibling index to insert at; appended when absent or out of range.
    pub index: Option<usize>,
    /// Namespace URI inherited from the parent.
    pub namespace: Option<String>,
    /// Replace the receiver instead of adding a child.
    pub replace: bool,
}

/// Turn `gene` into a live cell under `parent` and paint it.
pub fn build_cell(runtime: &Runtime, parent: NodeId, gene: Gene, placement: Placement) -> Result<NodeId> {
    let mut gene = store::infect(&runtime.node(parent), gene)?;
    normalize_text(&mut gene);

    let id = attach(
        runtime,
        parent,
        &gene,
        placement.index,
        placement.namespace.as_deref(),
        placement.replace,
    );
    let namespace = runtime.with_host(|host| host.namespace(id));
    registry::register(runtime, id, namespace);

    store::build(runtime, id, &gene, placement.inheritance);
    scheduler::define_all(runtime, id);
    apply::paint(runtime, id);

    debug!(node = id.0, parent = parent.0, "cell built");
    Ok(id)
}
