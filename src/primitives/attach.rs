//! Attachment Resolver - reuse an existing host node or insert a new one.
//!
//! Reuse, checked in order:
//! - replace-in-place was requested: a fresh node replaces the receiver when
//!   the description is marked with `$cell`
//! - the kind is a document region (`head`/`body`) that already exists
//! - the description's `id` names an existing element; an element of the
//!   wrong kind is replaced by a fresh one at the same position
//!
//! Otherwise a new node is inserted at the requested sibling index, or
//! appended when that index does not exist.

use tracing::trace;

use crate::engine::registry;
use crate::gene::{self as keys, DEFAULT_KIND, REGION_KINDS};
use crate::host::NodeId;
use crate::runtime::Runtime;
use crate::value::Gene;

use super::builder::build_host;

/// Resolve or create the host node for `gene` under `parent`.
pub fn attach(
    runtime: &Runtime,
    parent: NodeId,
    gene: &Gene,
    index: Option<usize>,
    namespace: Option<&str>,
    replace: bool,
) -> NodeId {
    match resolve(runtime, parent, gene, namespace, replace) {
        Some(existing) => existing,
        None => add(runtime, parent, gene, index, namespace),
    }
}

/// The node to reuse, if any reuse condition holds.
pub fn resolve(
    runtime: &Runtime,
    receiver: NodeId,
    gene: &Gene,
    namespace: Option<&str>,
    replace: bool,
) -> Option<NodeId> {
    if replace {
        let replacement = runtime.with_host_mut(|host| {
            let replacement = build_host(host, gene, namespace);
            if keys::is_cell(gene) {
                if let Some(parent) = host.parent(receiver) {
                    host.replace_child(parent, replacement, receiver);
                }
            }
            replacement
        });
        if keys::is_cell(gene) {
            registry::release(runtime, receiver);
        }
        return Some(replacement);
    }

    let kind = keys::kind_of(gene);
    if let Some(region) = kind.filter(|kind| REGION_KINDS.contains(kind)) {
        let existing = runtime.with_host(|host| match region {
            "head" => host.head(),
            _ => host.body(),
        });
        if existing.is_some() {
            return existing;
        }
    }

    let id = gene.get("id").and_then(|id| id.to_attribute())?;
    let existing = runtime.with_host(|host| host.element_by_id(&id))?;
    let wanted = kind.unwrap_or(DEFAULT_KIND).to_ascii_lowercase();
    let current = runtime
        .with_host(|host| host.tag(existing))
        .map(|tag| tag.to_ascii_lowercase());
    if current.as_deref() == Some(wanted.as_str()) {
        trace!(node = existing.0, id = id.as_str(), "reusing element by id");
        return Some(existing);
    }

    let replacement = runtime.with_host_mut(|host| {
        let replacement = build_host(host, gene, namespace);
        if let Some(parent) = host.parent(existing) {
            host.replace_child(parent, replacement, existing);
        }
        replacement
    });
    registry::release(runtime, existing);
    Some(replacement)
}

/// Build a new node and insert it under `parent`.
pub fn add(
    runtime: &Runtime,
    parent: NodeId,
    gene: &Gene,
    index: Option<usize>,
    namespace: Option<&str>,
) -> NodeId {
    runtime.with_host_mut(|host| {
        let node = build_host(host, gene, namespace);
        let reference = index.and_then(|index| host.children(parent).get(index).copied());
        match reference {
            Some(reference) => host.insert_before(parent, node, reference),
            None => host.append_child(parent, node),
        }
        node
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene;
    use crate::host::{Host, MemoryDocument};

    fn runtime() -> (Runtime, NodeId) {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        (Runtime::new(doc), body)
    }

    #[test]
    fn test_add_appends_or_inserts() {
        let (runtime, body) = runtime();
        let a = attach(&runtime, body, &gene! { "$type" => "a" }, None, None, false);
        let c = attach(&runtime, body, &gene! { "$type" => "i" }, Some(5), None, false);
        let b = attach(&runtime, body, &gene! { "$type" => "b" }, Some(1), None, false);
        assert_eq!(runtime.with_host(|h| h.children(body)), vec![a, b, c]);
    }

    #[test]
    fn test_region_reuse() {
        let (runtime, body) = runtime();
        let found = attach(&runtime, body, &gene! { "$type" => "body" }, None, None, false);
        assert_eq!(found, body);
        let head = attach(&runtime, body, &gene! { "$type" => "head" }, None, None, false);
        assert_eq!(Some(head), runtime.with_host(|h| h.head()));
    }

    #[test]
    fn test_id_reuse_same_kind() {
        let (runtime, body) = runtime();
        let existing = attach(&runtime, body, &gene! { "$type" => "p" }, None, None, false);
        runtime.with_host_mut(|h| h.set_attribute(existing, "id", "intro"));

        let found = attach(&runtime, body, &gene! { "$type" => "p", "id" => "intro" }, None, None, false);
        assert_eq!(found, existing);
    }

    #[test]
    fn test_id_reuse_replaces_wrong_kind() {
        let (runtime, body) = runtime();
        let first = attach(&runtime, body, &gene! {}, None, None, false);
        let existing = attach(&runtime, body, &gene! { "$type" => "p" }, None, None, false);
        runtime.with_host_mut(|h| h.set_attribute(existing, "id", "intro"));

        let found = attach(&runtime, body, &gene! { "$type" => "h1", "id" => "intro" }, None, None, false);
        assert_ne!(found, existing);
        assert_eq!(runtime.with_host(|h| h.children(body)), vec![first, found]);
        assert_eq!(runtime.with_host(|h| h.tag(found)).as_deref(), Some("h1"));
    }

    #[test]
    fn test_missing_id_falls_through() {
        let (runtime, body) = runtime();
        let node = attach(&runtime, body, &gene! { "id" => "nowhere" }, None, None, false);
        assert_eq!(runtime.with_host(|h| h.parent(node)), Some(body));
    }

    #[test]
    fn test_replace_in_place() {
        let (runtime, body) = runtime();
        let old = attach(&runtime, body, &gene! { "$type" => "p" }, None, None, false);
        let new = attach(&runtime, old, &gene! { "$cell" => true, "$type" => "h2" }, None, None, true);
        assert_eq!(runtime.with_host(|h| h.children(body)), vec![new]);
        assert_eq!(runtime.with_host(|h| h.parent(old)), None);

        // Without the marker the fresh node is left detached
        let loose = attach(&runtime, new, &gene! { "$type" => "em" }, None, None, true);
        assert_eq!(runtime.with_host(|h| h.parent(loose)), None);
    }
}
