//! Structural Store.
//!
//! Owns every write into a cell's store. Callables are bound through the
//! scheduler on the way in, except the initializer which is kept verbatim.

use tracing::trace;

use crate::error::{Error, Result};
use crate::gene::{self as keys, COMPONENTS, DEFAULT_KIND, INIT, TYPE, VIRUS};
use crate::host::NodeId;
use crate::node::Node;
use crate::pipeline::scheduler;
use crate::runtime::Runtime;
use crate::value::{Gene, Value};

use super::dirty::{self, Touch};
use super::registry;

/// Store `value` under `key` without tracking the write.
/// Returns the value as stored.
pub fn set(runtime: &Runtime, id: NodeId, key: &str, value: Value) -> Value {
    let stored = if key == INIT {
        value
    } else {
        scheduler::bind(runtime, id, value)
    };
    runtime.cell_mut(id, |state| {
        state.store.insert(key.to_string(), stored.clone());
    });
    stored
}

/// Tracked write: touch the key, store the value, mirror the store into the
/// parent's children list.
pub fn update(runtime: &Runtime, id: NodeId, key: &str, value: Value) -> Value {
    dirty::enqueue(runtime, id, key, Touch::Write);
    let stored = set(runtime, id, key, value);
    mirror_to_parent(runtime, id);
    trace!(node = id.0, key, "store update");
    stored
}

/// Replace the whole store with `gene`. Never merges.
pub fn build(runtime: &Runtime, id: NodeId, gene: &Gene, inheritance: Vec<String>) {
    runtime.cell_mut(id, |state| {
        state.store = Gene::new();
        state.inheritance = inheritance;
    });
    for (key, value) in gene {
        set(runtime, id, key, value.clone());
    }
}

/// Current value of `key`, untracked.
pub fn peek(runtime: &Runtime, id: NodeId, key: &str) -> Option<Value> {
    runtime.cell(id, |state| state.value(key).cloned()).flatten()
}

/// Copy of the whole store, untracked.
pub fn snapshot(runtime: &Runtime, id: NodeId) -> Option<Gene> {
    runtime.cell(id, |state| state.store.clone())
}

/// Run the description's `$virus` pipeline.
///
/// Each transform receives the record returned by the previous one and must
/// return a record itself. Transforms run with `this` as the receiver.
pub fn infect(this: &Node, mut gene: Gene) -> Result<Gene> {
    let mutations = match gene.shift_remove(VIRUS) {
        None | Some(Value::Null) => return Ok(gene),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    };
    if mutations.is_empty() {
        return Ok(gene);
    }

    for (step, mutation) in mutations.iter().enumerate() {
        let Value::Function(transform) = mutation else {
            return Err(Error::NotCallable(format!("{VIRUS}[{step}]")));
        };
        gene = match transform.call(this, &[Value::Object(gene)]) {
            Value::Object(mutated) => mutated,
            other => {
                return Err(Error::InvalidMutation {
                    step,
                    found: other.type_name(),
                });
            }
        };
    }

    let has_kind = gene.get(TYPE).is_some_and(|kind| kind.as_str().is_some_and(|s| !s.is_empty()));
    if !has_kind {
        gene.insert(TYPE.to_string(), Value::from(DEFAULT_KIND));
    }
    Ok(gene)
}

/// Write the cell's store into its parent's `$components` entry.
///
/// The parent's children list holds the children's stores after each
/// reconciliation; this keeps that entry in step with later writes. Skipped
/// when the list no longer lines up with the parent's cell children.
pub fn mirror_to_parent(runtime: &Runtime, id: NodeId) {
    let Some(parent) = runtime.with_host(|host| host.parent(id)) else {
        return;
    };
    if !runtime.is_cell(parent) {
        return;
    }
    let siblings = registry::cell_children(runtime, parent);
    let Some(position) = siblings.iter().position(|&sibling| sibling == id) else {
        return;
    };
    let Some(store) = snapshot(runtime, id) else {
        return;
    };
    runtime.cell_mut(parent, |state| {
        if let Some(Value::Array(children)) = state.store.get_mut(COMPONENTS) {
            if children.len() == siblings.len() {
                children[position] = Value::Object(store);
            }
        }
    });
}

/// Private keys owned by the cell's own store.
pub fn private_keys(runtime: &Runtime, id: NodeId) -> Vec<String> {
    runtime
        .cell(id, |state| {
            state
                .store
                .keys()
                .filter(|key| keys::is_private(key))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, MemoryDocument};
    use crate::{func, gene};

    fn cell() -> (Runtime, NodeId) {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let runtime = Runtime::new(doc);
        registry::register(&runtime, body, None);
        (runtime, body)
    }

    #[test]
    fn test_set_binds_callables_except_init() {
        let (runtime, id) = cell();
        let f = func!(|_this, _args| Value::Null);
        set(&runtime, id, "_fun", Value::from(f.clone()));
        set(&runtime, id, INIT, Value::from(f.clone()));

        let bound = peek(&runtime, id, "_fun").unwrap();
        assert!(bound.as_function().unwrap().is_bound());
        assert!(bound.as_function().unwrap().original().ptr_eq(&f));

        let init = peek(&runtime, id, INIT).unwrap();
        assert!(init.as_function().unwrap().ptr_eq(&f));
    }

    #[test]
    fn test_set_is_untracked() {
        let (runtime, id) = cell();
        set(&runtime, id, "_x", Value::from(1));
        assert!(runtime.pending().is_empty());
    }

    #[test]
    fn test_update_snapshots_then_stores() {
        let (runtime, id) = cell();
        set(&runtime, id, "_x", Value::from(1));
        update(&runtime, id, "_x", Value::from(2));
        update(&runtime, id, "_x", Value::from(3));

        assert_eq!(peek(&runtime, id, "_x"), Some(Value::from(3)));
        assert_eq!(runtime.pending(), vec![id]);
        let dirty = runtime.cell(id, |s| s.dirty.clone()).flatten().unwrap();
        assert_eq!(dirty["_x"].as_deref(), Some("1"));
    }

    #[test]
    fn test_build_replaces_store() {
        let (runtime, id) = cell();
        set(&runtime, id, "stale", Value::from(true));
        build(&runtime, id, &gene! { "$type" => "p", "_a" => 1 }, vec!["_up".into()]);

        let store = snapshot(&runtime, id).unwrap();
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["$type", "_a"]);
        assert_eq!(
            runtime.cell(id, |s| s.inheritance.clone()).unwrap(),
            vec!["_up".to_string()]
        );
        assert_eq!(private_keys(&runtime, id), vec!["_a".to_string()]);
    }

    #[test]
    fn test_infect_without_virus_is_identity() {
        let (runtime, id) = cell();
        let g = gene! { "class" => "x" };
        assert_eq!(infect(&runtime.node(id), g.clone()).unwrap(), g);
    }

    #[test]
    fn test_infect_chains_transforms() {
        let (runtime, id) = cell();
        let add_class = func!(|_this, args| {
            let mut g = args[0].as_object().cloned().unwrap_or_default();
            g.insert("class".into(), Value::from("a"));
            Value::Object(g)
        });
        let wrap = func!(|_this, args| {
            let seen = args[0].as_object().cloned().unwrap_or_default();
            let mut g = Gene::new();
            g.insert("$type".into(), Value::from("section"));
            g.insert("$components".into(), Value::Array(vec![Value::Object(seen)]));
            Value::Object(g)
        });
        let g = gene! { "$text" => "hi", "$virus" => vec![add_class, wrap] };

        let out = infect(&runtime.node(id), g).unwrap();
        assert_eq!(out["$type"], Value::from("section"));
        let inner = out["$components"].as_array().unwrap()[0].as_object().unwrap();
        assert_eq!(inner, &gene! { "$text" => "hi", "class" => "a" });
    }

    #[test]
    fn test_infect_defaults_kind() {
        let (runtime, id) = cell();
        let same = func!(|_this, args| args[0].clone());
        let out = infect(&runtime.node(id), gene! { "$virus" => same }).unwrap();
        assert_eq!(out, gene! { "$type" => "div" });
    }

    #[test]
    fn test_infect_rejects_non_records() {
        let (runtime, id) = cell();
        let ok = func!(|_this, args| args[0].clone());
        let bad = func!(|_this, _args| Value::from("nope"));
        let err = infect(&runtime.node(id), gene! { "$virus" => vec![ok, bad] }).unwrap_err();
        assert!(matches!(err, Error::InvalidMutation { step: 1, found: "string" }));
    }

    #[test]
    fn test_mirror_to_parent() {
        let (runtime, body) = cell();
        let child = runtime.with_host_mut(|host| {
            let child = host.create_element("p");
            host.append_child(body, child);
            child
        });
        registry::register(&runtime, child, None);
        set(&runtime, body, COMPONENTS, Value::from(vec![gene! { "_n" => 0 }]));
        set(&runtime, child, "_n", Value::from(0));

        update(&runtime, child, "_n", Value::from(7));

        let components = peek(&runtime, body, COMPONENTS).unwrap();
        assert_eq!(components, Value::from(vec![gene! { "_n" => 7 }]));
    }
}
