//! Presentation Applier - store values onto the host tree.
//!
//! Dispatch by key:
//!
//! | key            | effect                                          |
//! |----------------|-------------------------------------------------|
//! | `$type`        | rebuild the node as the new kind, swap it in    |
//! | `$text`        | text content                                    |
//! | `$html`        | inner markup                                    |
//! | `$components`  | children reconciliation                         |
//! | `_*`           | nothing                                         |
//! | `value`        | native `value` property                         |
//! | `style` record | style members                                   |
//! | primitives     | attributes                                      |
//! | callables      | native handlers, when the host has the property |

use tracing::{error, trace};

use crate::engine::{dirty, registry, store, CellFlags};
use crate::gene::{self as keys, COMPONENTS, HTML, TEXT, TYPE, UPDATE};
use crate::host::{NodeId, NodeKind};
use crate::pipeline::scheduler::FrameTask;
use crate::primitives::{build_cell, Placement};
use crate::runtime::Runtime;
use crate::value::{unbind_gene, Value};

use super::reconcile::reconcile;

/// Apply one store entry to the host node.
pub fn apply(runtime: &Runtime, id: NodeId, key: &str, value: &Value) {
    trace!(node = id.0, key, "apply");
    match key {
        TYPE => {
            if let Some(kind) = value.as_str() {
                change_kind(runtime, id, kind);
            }
        }
        TEXT => {
            let text = content_text(id, runtime, value);
            runtime.with_host_mut(|host| host.set_text_content(id, &text));
        }
        HTML => {
            let markup = content_text(id, runtime, value);
            runtime.with_host_mut(|host| host.set_inner_html(id, &markup));
        }
        COMPONENTS => {
            let components = value.as_array().map(Vec::as_slice).unwrap_or_default();
            reconcile(runtime, id, components);
        }
        _ if keys::is_reserved(key) || keys::is_private(key) => {}
        "value" => runtime.with_host_mut(|host| host.set_property(id, key, value.clone())),
        "style" if matches!(value, Value::Object(_)) => {
            let Value::Object(members) = value else { return };
            runtime.with_host_mut(|host| {
                for (property, member) in members {
                    host.set_style(id, property, &member.to_text());
                }
            });
        }
        _ => match value {
            Value::Function(handler) => runtime.with_host_mut(|host| {
                if host.has_native_property(id, key) {
                    host.set_handler(id, key, handler.clone());
                }
            }),
            primitive => {
                if let Some(text) = primitive.to_attribute() {
                    runtime.with_host_mut(|host| host.set_attribute(id, key, &text));
                }
            }
        },
    }
}

/// First paint of a freshly built cell: schedule the initializer, then apply
/// every non-null store entry.
pub fn paint(runtime: &Runtime, id: NodeId) {
    run_init(runtime, id);
    let Some(entries) = store::snapshot(runtime, id) else {
        return;
    };
    for (key, value) in entries.iter().filter(|(_, value)| !value.is_null()) {
        apply(runtime, id, key, value);
        if !runtime.is_cell(id) {
            break;
        }
    }
}

/// Schedule the cell's initializer for the next frame.
pub fn run_init(runtime: &Runtime, id: NodeId) {
    runtime.schedule(FrameTask::Init(id));
}

/// Run the cell's model-update callback, then repaint its Dirty keys.
///
/// Skipped for detached nodes, for nodes already inside their own update,
/// and for nodes without a callable `$update`.
pub fn run_update(runtime: &Runtime, id: NodeId) {
    if runtime.with_host(|host| host.parent(id)).is_none() {
        return;
    }
    let updating = runtime
        .cell(id, |state| state.flags.contains(CellFlags::UPDATING))
        .unwrap_or(true);
    if updating {
        return;
    }
    let Some(Value::Function(update)) = store::peek(runtime, id, UPDATE) else {
        return;
    };

    runtime.cell_mut(id, |state| state.flags.insert(CellFlags::UPDATING));
    update.call(&runtime.node(id), &[]);

    for key in dirty::keys(runtime, id) {
        if !runtime.is_cell(id) {
            return;
        }
        let value = store::peek(runtime, id, &key).unwrap_or_default();
        apply(runtime, id, &key, &value);
    }
    runtime.cell_mut(id, |state| {
        state.flags.remove(CellFlags::UPDATING);
        state.dirty = None;
    });
}

/// `$text`/`$html` content: callables contribute their block-comment body,
/// or their return value when they have none.
fn content_text(id: NodeId, runtime: &Runtime, value: &Value) -> String {
    match value {
        Value::Function(f) => match f.multiline() {
            Some(text) => text,
            None => f.original().call(&runtime.node(id), &[]).to_text(),
        },
        other => other.to_text(),
    }
}

/// Kind name the host node currently has.
fn current_kind(runtime: &Runtime, id: NodeId) -> String {
    match runtime.with_host(|host| host.kind(id)) {
        NodeKind::Element(tag) => tag.to_ascii_lowercase(),
        NodeKind::Text => keys::TEXT_KIND.to_string(),
        NodeKind::Fragment => keys::FRAGMENT_KIND.to_string(),
        NodeKind::Document | NodeKind::Markup => String::new(),
    }
}

/// Rebuild the node as `kind` from its own store and swap it into place.
fn change_kind(runtime: &Runtime, id: NodeId, kind: &str) {
    if kind.to_ascii_lowercase() == current_kind(runtime, id) {
        return;
    }
    let Some(parent) = runtime.with_host(|host| host.parent(id)) else {
        return;
    };
    let Some((store, inheritance, namespace)) = runtime.cell(id, |state| {
        (unbind_gene(&state.store), state.inheritance.clone(), state.namespace.clone())
    }) else {
        return;
    };

    let fragment = runtime.with_host_mut(|host| host.create_fragment());
    let placement = Placement {
        inheritance,
        namespace,
        ..Placement::default()
    };
    match build_cell(runtime, fragment, store, placement) {
        Ok(replacement) => {
            runtime.with_host_mut(|host| host.replace_child(parent, replacement, id));
            registry::release(runtime, id);
        }
        Err(err) => error!(node = id.0, kind, %err, "kind change failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene;
    use crate::host::{Host, MemoryDocument};
    use crate::value::Callable;
    use pretty_assertions::assert_eq;

    fn mounted(g: crate::Gene) -> (Runtime, NodeId, NodeId) {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let runtime = Runtime::new(doc);
        let id = build_cell(&runtime, body, g, Placement::default()).unwrap();
        (runtime, body, id)
    }

    fn html(runtime: &Runtime, id: NodeId) -> String {
        runtime.with_host(|h| h.outer_html(id))
    }

    #[test]
    fn test_private_keys_are_not_painted() {
        let (runtime, _, id) = mounted(gene! { "_secret" => "x", "title" => "t" });
        assert_eq!(html(&runtime, id), "<div title=\"t\"></div>");
    }

    #[test]
    fn test_numbers_and_booleans_as_attributes() {
        let (runtime, _, id) = mounted(gene! { "$type" => "input", "tabindex" => 2, "disabled" => true });
        assert_eq!(html(&runtime, id), "<input tabindex=\"2\" disabled=\"true\"></input>");
    }

    #[test]
    fn test_style_record() {
        let (runtime, _, id) = mounted(gene! {
            "style" => gene! { "backgroundColor" => "red", "width" => "10px" },
        });
        assert_eq!(
            runtime.with_host(|h| h.get_attribute(id, "style")).as_deref(),
            Some("background-color: red; width: 10px;")
        );
    }

    #[test]
    fn test_native_handlers_only() {
        let click = Callable::new("|_| clicked()", |_, _| Value::Null);
        let custom = Callable::new("|_| custom()", |_, _| Value::Null);
        let (runtime, _, id) = mounted(gene! { "onclick" => click, "fancy" => custom });

        let handler = runtime.with_host(|h| h.handler(id, "onclick")).unwrap();
        assert_eq!(handler.source(), "|_| clicked()");
        assert!(handler.is_bound());
        assert!(runtime.with_host(|h| h.handler(id, "fancy")).is_none());
        assert_eq!(runtime.with_host(|h| h.get_attribute(id, "fancy")), None);
    }

    #[test]
    fn test_html_from_multiline() {
        let body = Callable::new("|| {/*\n<b>bold</b>\n*/}", |_, _| Value::Null);
        let (runtime, _, id) = mounted(gene! { "$html" => body });
        assert_eq!(html(&runtime, id), "<div><b>bold</b></div>");
    }

    #[test]
    fn test_text_from_callable_result() {
        let text = Callable::new("|| greeting()", |_, _| Value::from("hi"));
        let (runtime, _, id) = mounted(gene! { "$text" => text });
        assert_eq!(html(&runtime, id), "<div>hi</div>");
    }

    #[test]
    fn test_kind_change_rebuilds_in_place() {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let runtime = Runtime::new(doc);
        let first = build_cell(&runtime, body, gene! { "$type" => "i" }, Placement::default()).unwrap();
        let id = build_cell(&runtime, body, gene! { "$type" => "p", "class" => "x" }, Placement::default()).unwrap();

        store::set(&runtime, id, TYPE, Value::from("h1"));
        apply(&runtime, id, TYPE, &Value::from("h1"));

        assert!(!runtime.is_cell(id));
        let children = runtime.with_host(|h| h.children(body));
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], first);
        assert_eq!(html(&runtime, children[1]), "<h1 class=\"x\"></h1>");
        assert!(runtime.is_cell(children[1]));
    }

    #[test]
    fn test_same_kind_is_noop() {
        let (runtime, body, id) = mounted(gene! { "$type" => "P" });
        apply(&runtime, id, TYPE, &Value::from("p"));
        assert!(runtime.is_cell(id));
        assert_eq!(runtime.with_host(|h| h.children(body)), vec![id]);
    }

    #[test]
    fn test_paint_schedules_init() {
        let (runtime, _, id) = mounted(gene! {});
        // Init task is queued even without an initializer
        assert!(!runtime.is_idle());
        assert_eq!(runtime.tick().inits, 0);
        assert!(runtime.is_cell(id));
    }
}
