//! Live node handles.
//!
//! A [`Node`] is the reactive surface of one host node. Reads and writes of
//! keys with an installed accessor go through the cell's store and feed the
//! scheduler; everything else falls through to the host's native properties.
//!
//! # Example
//!
//! ```ignore
//! let counter = body.build(gene! {
//!     "_count" => 0,
//!     "$update" => func!(|this, _| {
//!         let count = this.get("_count");
//!         this.set("$text", count.to_text());
//!         Value::Null
//!     }),
//! })?;
//!
//! counter.set("_count", 1);      // tracked write, repaint deferred
//! counter.runtime().tick();      // nothing queued a flush yet
//! counter.call("$update", &[])?; // bound call queues one
//! counter.runtime().tick();      // flush: `_count` changed, `$update` runs
//! ```

use std::fmt;

use crate::engine::{dirty, registry, store, DirtyRecord, Touch};
use crate::error::{Error, Result};
use crate::gene as keys;
use crate::host::NodeId;
use crate::primitives::{build_cell, Placement};
use crate::renderer::apply;
use crate::renderer::reconcile::child_inheritance;
use crate::runtime::Runtime;
use crate::value::{to_json, unbind_gene, Gene, Value};

/// Handle to a host node within a [`Runtime`].
#[derive(Clone)]
pub struct Node {
    runtime: Runtime,
    id: NodeId,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("cell", &self.is_cell())
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Node {
    pub(crate) fn new(runtime: Runtime, id: NodeId) -> Self {
        Self { runtime, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Whether a description is attached to this node.
    pub fn is_cell(&self) -> bool {
        self.runtime.is_cell(self.id)
    }

    /// Whether `key` has an installed accessor on this node.
    pub fn is_reactive(&self, key: &str) -> bool {
        self.runtime
            .cell(self.id, |state| state.reactive.contains(key))
            .unwrap_or(false)
    }

    // =========================================================================
    // Reactive surface
    // =========================================================================

    /// Read `key`.
    ///
    /// Reserved and private keys come from the store, and container reads are
    /// tracked. A private key the store lacks resolves on the nearest ancestor
    /// that owns it. Public keys read the store, falling back to the host's
    /// native property; `value` and `style` always read the host.
    pub fn get(&self, key: &str) -> Value {
        if !self.is_reactive(key) {
            return self.native(key);
        }

        if keys::is_reserved(key) || keys::is_private(key) {
            if let Some(value) = store::peek(&self.runtime, self.id, key) {
                dirty::enqueue(&self.runtime, self.id, key, Touch::Read);
                return value;
            }
            if keys::is_private(key) {
                if let Some(owner) = registry::owner_of(&self.runtime, self.id, key) {
                    dirty::enqueue(&self.runtime, owner, key, Touch::Read);
                    return store::peek(&self.runtime, owner, key).unwrap_or_default();
                }
            }
            return Value::Null;
        }

        match key {
            "value" | "style" => self.native(key),
            _ => store::peek(&self.runtime, self.id, key).unwrap_or_else(|| self.native(key)),
        }
    }

    /// Write `key`.
    ///
    /// The store update is tracked and painted on the next flush. Private keys
    /// the node does not own are written on the nearest ancestor owning them.
    /// Public keys are also written to the host immediately.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if !self.is_reactive(key) {
            self.runtime
                .with_host_mut(|host| host.set_property(self.id, key, value));
            return;
        }

        let owner = if keys::is_private(key)
            && !self.runtime.cell(self.id, |state| state.has(key)).unwrap_or(false)
        {
            registry::owner_of(&self.runtime, self.id, key).unwrap_or(self.id)
        } else {
            self.id
        };
        let stored = store::update(&self.runtime, owner, key, value);

        if keys::is_public(key) {
            self.write_native(key, stored);
        }
    }

    /// Mutate `key` in place: read it, let `f` change it, write it back.
    pub fn modify<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut value = self.get(key);
        let result = f(&mut value);
        self.set(key, value);
        result
    }

    /// Call the callable stored under `key` with this node as receiver.
    pub fn call(&self, key: &str, args: &[Value]) -> Result<Value> {
        match self.get(key) {
            Value::Function(f) => Ok(f.call(self, args)),
            _ => Err(Error::NotCallable(key.to_string())),
        }
    }

    /// Run the model-update callback now and repaint the dirty keys.
    pub fn update(&self) {
        apply::run_update(&self.runtime, self.id);
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Attach `gene` as a new child cell. The child inherits the same
    /// private keys a reconciled child would.
    pub fn build(&self, gene: Gene) -> Result<Node> {
        let placement = Placement {
            inheritance: child_inheritance(&self.runtime, self.id),
            namespace: self.runtime.cell(self.id, |s| s.namespace.clone()).flatten(),
            ..Placement::default()
        };
        let id = build_cell(&self.runtime, self.id, gene, placement)?;
        Ok(self.runtime.node(id))
    }

    /// Instantiate `gene` in place of this node.
    ///
    /// The fresh node takes this node's position when the description carries
    /// `$cell`; otherwise it is returned detached.
    pub fn cell(&self, gene: Gene, namespace: Option<&str>) -> Result<Node> {
        let placement = Placement {
            namespace: namespace.map(str::to_string),
            replace: true,
            ..Placement::default()
        };
        let id = build_cell(&self.runtime, self.id, gene, placement)?;
        Ok(self.runtime.node(id))
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The store with every bound callable replaced by its original.
    pub fn snapshot(&self) -> Gene {
        store::snapshot(&self.runtime, self.id)
            .map(|store| unbind_gene(&store))
            .unwrap_or_default()
    }

    /// The store as JSON, callables rendered as `"(source)"`.
    pub fn export(&self) -> serde_json::Value {
        to_json(&Value::Object(self.snapshot()))
    }

    /// The pending Dirty record, if the node was touched this cycle.
    pub fn dirty_snapshot(&self) -> Option<DirtyRecord> {
        self.runtime.cell(self.id, |state| state.dirty.clone()).flatten()
    }

    pub fn parent(&self) -> Option<Node> {
        self.runtime
            .with_host(|host| host.parent(self.id))
            .map(|id| self.runtime.node(id))
    }

    pub fn children(&self) -> Vec<Node> {
        self.runtime
            .with_host(|host| host.children(self.id))
            .into_iter()
            .map(|id| self.runtime.node(id))
            .collect()
    }

    pub fn tag(&self) -> Option<String> {
        self.runtime.with_host(|host| host.tag(self.id))
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.runtime.with_host(|host| host.get_attribute(self.id, name))
    }

    pub fn text_content(&self) -> String {
        self.runtime.with_host(|host| host.text_content(self.id))
    }

    pub fn outer_html(&self) -> String {
        self.runtime.with_host(|host| host.outer_html(self.id))
    }

    // =========================================================================
    // Host passthrough
    // =========================================================================

    fn native(&self, key: &str) -> Value {
        self.runtime.with_host(|host| host.property(self.id, key))
    }

    fn write_native(&self, key: &str, value: Value) {
        let id = self.id;
        self.runtime.with_host_mut(|host| match (key, value) {
            ("value", value) => host.set_property(id, key, value),
            ("style", value @ Value::Object(_)) => host.set_property(id, key, value),
            (_, Value::Function(handler)) => {
                if host.has_native_property(id, key) {
                    host.set_handler(id, key, handler);
                }
            }
            (_, value) => {
                if let Some(text) = value.to_attribute() {
                    host.set_attribute(id, key, &text);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CellFlags;
    use crate::host::{Host, MemoryDocument, SVG_NAMESPACE};
    use crate::value::Callable;
    use crate::{func, gene};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn body() -> Node {
        Runtime::new(MemoryDocument::new()).body().unwrap()
    }

    fn counting_update(calls: &Rc<Cell<usize>>) -> Callable {
        let calls = calls.clone();
        Callable::new("counting_update", move |this, _| {
            calls.set(calls.get() + 1);
            this.update();
            Value::Null
        })
    }

    #[test]
    fn test_public_write_is_immediate() {
        let node = body().build(gene! { "class" => "a" }).unwrap();
        node.set("class", "b");
        assert_eq!(node.attribute("class").as_deref(), Some("b"));
        assert_eq!(node.get("class"), Value::from("b"));
        assert_eq!(node.runtime().pending(), vec![node.id()]);
    }

    #[test]
    fn test_reserved_write_is_deferred() {
        let node = body().build(gene! { "$text" => "old" }).unwrap();
        node.set("$text", "new");
        assert_eq!(node.text_content(), "old");
        node.runtime().flush();
        assert_eq!(node.text_content(), "new");
    }

    #[test]
    fn test_missing_reserved_key_reads_null() {
        let node = body().build(gene! {}).unwrap();
        assert_eq!(node.get("$text"), Value::Null);
    }

    #[test]
    fn test_native_fallback() {
        let node = body().build(gene! { "$type" => "input" }).unwrap();
        assert_eq!(node.get("tagName"), Value::from("INPUT"));
        node.set("value", "typed");
        assert_eq!(node.get("value"), Value::from("typed"));
    }

    #[test]
    fn test_undeclared_key_is_not_reactive() {
        let node = body().build(gene! {}).unwrap();
        node.set("_extra", 1);
        assert!(!node.is_reactive("_extra"));
        assert!(node.runtime().pending().is_empty());
        assert_eq!(node.get("_extra"), Value::from(1));
    }

    #[test]
    fn test_modify_snapshots_before_mutation() {
        let node = body().build(gene! { "_items" => vec![1, 2] }).unwrap();
        node.modify("_items", |items| {
            if let Some(items) = items.as_array_mut() {
                items.push(Value::from(3));
            }
        });
        assert_eq!(node.get("_items"), Value::from(vec![1, 2, 3]));
        let dirty = node.dirty_snapshot().unwrap();
        assert_eq!(dirty["_items"].as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_call_requires_callable() {
        let node = body().build(gene! { "_n" => 1 }).unwrap();
        assert!(matches!(node.call("_n", &[]), Err(Error::NotCallable(key)) if key == "_n"));
    }

    #[test]
    fn test_call_runs_with_receiver() {
        let node = body()
            .build(gene! {
                "_n" => 1,
                "_inc" => func!(|this, _args| {
                    let n = this.get("_n").as_f64().unwrap_or(0.0);
                    this.set("_n", n + 1.0);
                    Value::Null
                }),
            })
            .unwrap();
        node.call("_inc", &[]).unwrap();
        assert_eq!(node.get("_n"), Value::from(2));
    }

    #[test]
    fn test_snapshot_unbinds_callables() {
        let f = func!(|_this, _args| Value::Null);
        let node = body().build(gene! { "_fun" => f.clone() }).unwrap();
        let snap = node.snapshot();
        assert!(snap["_fun"].as_function().unwrap().ptr_eq(&f));
    }

    #[test]
    fn test_export() {
        let node = body()
            .build(gene! { "$type" => "p", "_n" => 2, "_f" => crate::Callable::new("|| 1", |_, _| Value::Null) })
            .unwrap();
        assert_eq!(
            node.export(),
            serde_json::json!({ "$type": "p", "_n": 2, "_f": "(|| 1)" })
        );
    }

    #[test]
    fn test_parent_and_children() {
        let root = body();
        let child = root.build(gene! { "$type" => "p" }).unwrap();
        assert_eq!(child.parent(), Some(root.clone()));
        assert_eq!(root.children(), vec![child]);
    }

    #[test]
    fn test_declared_value_uses_native_property() {
        let input = body().build(gene! { "$type" => "input", "value" => "x" }).unwrap();
        assert_eq!(input.attribute("value"), None);
        assert_eq!(input.get("value"), Value::from("x"));
        assert!(input.is_reactive("value"));

        input.set("value", "y");
        assert_eq!(input.get("value"), Value::from("y"));
        assert_eq!(
            input.runtime().with_host(|host| host.property(input.id(), "value")),
            Value::from("y")
        );
        assert_eq!(input.attribute("value"), None);
    }

    #[test]
    fn test_empty_input_value() {
        let input = body().build(gene! { "$type" => "input", "value" => "" }).unwrap();
        assert_eq!(input.get("value"), Value::from(""));
        input.set("value", "typed");
        assert_eq!(input.get("value"), Value::from("typed"));
    }

    #[test]
    fn test_update_does_not_reenter() {
        let calls = Rc::new(Cell::new(0));
        let node = body().build(gene! { "$update" => counting_update(&calls) }).unwrap();

        node.update();

        assert_eq!(calls.get(), 1);
        let updating = node
            .runtime()
            .cell(node.id(), |state| state.flags.contains(CellFlags::UPDATING))
            .unwrap();
        assert!(!updating);

        node.update();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_detached_cell_does_not_update() {
        let calls = Rc::new(Cell::new(0));
        let anchor = body().build(gene! { "$type" => "p" }).unwrap();
        let detached = anchor
            .cell(gene! { "$type" => "em", "$update" => counting_update(&calls) }, None)
            .unwrap();
        assert!(detached.parent().is_none());

        detached.update();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_cell_with_namespace() {
        let root = body();
        let anchor = root.build(gene! { "$type" => "p" }).unwrap();
        let circle = anchor
            .cell(gene! { "$cell" => true, "$type" => "circle" }, Some(SVG_NAMESPACE))
            .unwrap();

        assert_eq!(circle.parent(), Some(root.clone()));
        assert_eq!(circle.tag().as_deref(), Some("circle"));
        assert_eq!(
            circle.runtime().with_host(|host| host.namespace(circle.id())).as_deref(),
            Some(SVG_NAMESPACE)
        );
        assert_eq!(
            circle.runtime().cell(circle.id(), |state| state.namespace.clone()).flatten().as_deref(),
            Some(SVG_NAMESPACE)
        );
    }

    #[test]
    fn test_built_child_inherits_private_keys() {
        let parent = body().build(gene! { "_theme" => "dark" }).unwrap();
        let child = parent.build(gene! { "$type" => "span" }).unwrap();

        assert!(child.is_reactive("_theme"));
        assert_eq!(child.get("_theme"), Value::from("dark"));

        child.set("_theme", "light");
        assert_eq!(parent.get("_theme"), Value::from("light"));
        assert!(!child.snapshot().contains_key("_theme"));
    }
}
