//! Children reconciliation.
//!
//! Compares the stores of a parent's current cell children with a new list of
//! descriptions and edits the host tree with as few operations as the LCS
//! allows. Host children that are not cells (injected by other code) are left
//! out of the comparison.
//!
//! # Passes
//!
//! - First paint (no cell children yet): clear the parent, build every child
//!   into one fragment, append it once
//! - Otherwise: diff, mark `minus` children with [`CellFlags::KILL`], remove and
//!   release them, then build each `plus` description at its index
//!
//! Either way the parent's `$components` ends up holding the children's stores.

use tracing::{debug, debug_span, error};

use crate::engine::{registry, store, CellFlags};
use crate::gene::COMPONENTS;
use crate::host::NodeId;
use crate::primitives::{build_cell, Placement};
use crate::runtime::Runtime;
use crate::value::{Gene, Value};

use super::diff::diff;

/// Reconcile the children of `parent` against `components`.
/// Entries that are not records are skipped.
pub fn reconcile(runtime: &Runtime, parent: NodeId, components: &[Value]) {
    let _span = debug_span!("reconcile", parent = parent.0, wanted = components.len()).entered();

    let descriptions: Vec<Gene> = components
        .iter()
        .filter_map(|component| component.as_object().cloned())
        .collect();
    if descriptions.len() != components.len() {
        debug!(skipped = components.len() - descriptions.len(), "non-record children skipped");
    }

    let children = registry::cell_children(runtime, parent);
    let inheritance = child_inheritance(runtime, parent);
    let namespace = runtime.cell(parent, |state| state.namespace.clone()).flatten();
    let placement = |index: Option<usize>| Placement {
        inheritance: inheritance.clone(),
        index,
        namespace: namespace.clone(),
        replace: false,
    };

    if children.is_empty() {
        let fragment = runtime.with_host_mut(|host| {
            for stray in host.children(parent) {
                host.remove_child(parent, stray);
            }
            host.create_fragment()
        });
        for gene in descriptions {
            if let Err(err) = build_cell(runtime, fragment, gene, placement(None)) {
                error!(parent = parent.0, %err, "child build failed");
            }
        }
        runtime.with_host_mut(|host| host.append_child(parent, fragment));
    } else {
        let old: Vec<Value> = children
            .iter()
            .filter_map(|&child| store::snapshot(runtime, child))
            .map(Value::Object)
            .collect();
        let new: Vec<Value> = descriptions.into_iter().map(Value::Object).collect();
        let changes = diff(&old, &new);
        debug!(minus = changes.minus.len(), plus = changes.plus.len(), "children diff");

        for change in &changes.minus {
            if let Some(&child) = children.get(change.index) {
                runtime.cell_mut(child, |state| state.flags.insert(CellFlags::KILL));
            }
        }
        let doomed: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|&child| {
                runtime
                    .cell(child, |state| state.flags.contains(CellFlags::KILL))
                    .unwrap_or(false)
            })
            .collect();
        for child in doomed {
            runtime.with_host_mut(|host| host.remove_child(parent, child));
            registry::release(runtime, child);
        }

        for change in changes.plus {
            let Value::Object(gene) = change.item else { continue };
            if let Err(err) = build_cell(runtime, parent, gene, placement(Some(change.index))) {
                error!(parent = parent.0, index = change.index, %err, "child build failed");
            }
        }
    }

    record_children(runtime, parent);
}

/// Inheritance handed to children: the parent's own inheritance followed by
/// the private keys its store owns.
pub fn child_inheritance(runtime: &Runtime, parent: NodeId) -> Vec<String> {
    let mut inheritance = runtime
        .cell(parent, |state| state.inheritance.clone())
        .unwrap_or_default();
    for key in store::private_keys(runtime, parent) {
        if !inheritance.contains(&key) {
            inheritance.push(key);
        }
    }
    inheritance
}

/// Store the children's stores under the parent's `$components`, untracked.
fn record_children(runtime: &Runtime, parent: NodeId) {
    let stores: Vec<Value> = registry::cell_children(runtime, parent)
        .into_iter()
        .filter_map(|child| store::snapshot(runtime, child))
        .map(Value::Object)
        .collect();
    runtime.cell_mut(parent, |state| {
        state.store.insert(COMPONENTS.to_string(), Value::Array(stores));
    });
}
