//! Reactive surface and flush protocol, end to end.
//!
//! Run with: RUST_LOG=spark_cell=trace cargo test --test reactivity -- --nocapture

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use spark_cell::{func, gene, Callable, Host, MemoryDocument, Node, Runtime, Value, SVG_NAMESPACE};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn body() -> (Runtime, Node) {
    init_tracing();
    let runtime = Runtime::new(MemoryDocument::new());
    let body = runtime.body().unwrap();
    (runtime, body)
}

// =============================================================================
// Touch tracking
// =============================================================================

#[test]
fn test_private_write_queues_once_with_first_snapshot() {
    let (runtime, body) = body();
    let node = body.build(gene! { "_n" => 1 }).unwrap();

    node.set("_n", 2);
    node.set("_n", 3);

    assert_eq!(runtime.pending(), vec![node.id()]);
    let dirty = node.dirty_snapshot().unwrap();
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty["_n"].as_deref(), Some("1"));

    assert_eq!(runtime.flush(), 1);
    assert!(runtime.pending().is_empty());
    assert_eq!(node.dirty_snapshot(), None);
}

#[test]
fn test_scalar_reads_do_not_queue() {
    let (runtime, body) = body();
    let node = body.build(gene! { "_n" => 1, "_list" => vec![1] }).unwrap();

    assert_eq!(node.get("_n"), Value::from(1));
    assert!(runtime.pending().is_empty());

    node.get("_list");
    assert_eq!(runtime.pending(), vec![node.id()]);
}

// =============================================================================
// Context inheritance
// =============================================================================

#[test]
fn test_descendant_write_updates_ancestor() {
    let (runtime, body) = body();
    let root = body
        .build(gene! {
            "_model" => vec!["x"],
            "$components" => vec![gene! { "$type" => "p" }, gene! { "$type" => "span" }],
        })
        .unwrap();
    let children = root.children();
    let (p, span) = (&children[0], &children[1]);

    assert_eq!(p.get("_model"), Value::from(vec!["x"]));

    p.modify("_model", |model| {
        if let Some(items) = model.as_array_mut() {
            items.push(Value::from("y"));
        }
    });

    assert_eq!(span.get("_model"), Value::from(vec!["x", "y"]));
    assert_eq!(root.get("_model"), Value::from(vec!["x", "y"]));
    assert!(!p.snapshot().contains_key("_model"));

    // The owner is the node that got queued, with the pre-mutation value
    assert_eq!(runtime.pending(), vec![root.id()]);
    assert_eq!(root.dirty_snapshot().unwrap()["_model"].as_deref(), Some("[\"x\"]"));
}

#[test]
fn test_inheritance_skips_to_nearest_owner() {
    let (_runtime, body) = body();
    let root = body
        .build(gene! {
            "_theme" => "dark",
            "$components" => vec![gene! {
                "_theme" => "light",
                "$components" => vec![gene! { "$type" => "em" }],
            }],
        })
        .unwrap();
    let middle = &root.children()[0];
    let leaf = &middle.children()[0];
    assert_eq!(leaf.get("_theme"), Value::from("light"));
}

// =============================================================================
// Update callbacks
// =============================================================================

fn counter(body: &Node) -> Node {
    body.build(gene! {
        "$type" => "button",
        "_count" => 0,
        "$text" => "0",
        "onclick" => func!(|this, _args| {
            this.modify("_count", |n| *n = Value::from(n.as_f64().unwrap_or(0.0) + 1.0));
            Value::Null
        }),
        "$update" => func!(|this, _args| {
            let count = this.get("_count");
            this.set("$text", count.to_text());
            Value::Null
        }),
    })
    .unwrap()
}

#[test]
fn test_event_handler_drives_update() {
    let (runtime, body) = body();
    let button = counter(&body);
    runtime.tick();

    runtime.dispatch(button.id(), "onclick", &[]).unwrap();
    // The handler ran synchronously; presentation waits for the frame
    assert_eq!(button.get("_count"), Value::from(1));
    assert_eq!(button.text_content(), "0");

    let report = runtime.tick();
    assert_eq!(report.flushes, vec![1]);
    assert_eq!(button.text_content(), "1");

    // `$update` is bound too, so it queued one more (empty) flush
    assert_eq!(runtime.tick().flushes, vec![0]);
    assert!(runtime.is_idle());
}

#[test]
fn test_unchanged_private_key_skips_update() {
    let (runtime, body) = body();
    let button = counter(&body);
    runtime.tick();

    button.set("_count", 0);
    runtime.flush();
    assert_eq!(button.text_content(), "0");
    assert!(runtime.is_idle());
}

#[test]
fn test_public_change_does_not_run_update() {
    let (runtime, body) = body();
    let calls = Rc::new(RefCell::new(0));
    let seen = calls.clone();
    let node = body
        .build(gene! {
            "title" => "a",
            "$update" => Callable::new("count_updates", move |_, _| {
                *seen.borrow_mut() += 1;
                Value::Null
            }),
        })
        .unwrap();

    node.set("title", "b");
    assert_eq!(node.attribute("title").as_deref(), Some("b"));
    runtime.flush();
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_explicit_update() {
    let (_runtime, body) = body();
    let button = counter(&body);
    button.set("_count", 5);
    button.update();
    assert_eq!(button.text_content(), "5");
    assert_eq!(button.dirty_snapshot(), None);
}

#[test]
fn test_init_runs_next_frame() {
    let (runtime, body) = body();
    let node = body
        .build(gene! {
            "_ready" => false,
            "class" => "",
            "$init" => func!(|this, _args| {
                this.set("_ready", true);
                Value::Null
            }),
            "$update" => func!(|this, _args| {
                this.set("class", "ready");
                Value::Null
            }),
        })
        .unwrap();
    assert_eq!(node.get("_ready"), Value::from(false));

    let first = runtime.tick();
    assert_eq!(first.inits, 1);
    assert_eq!(node.get("_ready"), Value::from(true));
    assert_eq!(node.attribute("class").as_deref(), Some(""));

    let second = runtime.tick();
    assert_eq!(second.flushes, vec![1]);
    assert_eq!(node.attribute("class").as_deref(), Some("ready"));
}

// =============================================================================
// Reentrancy
// =============================================================================

#[test]
fn test_nested_bound_calls_share_one_effective_flush() {
    let (runtime, body) = body();
    let node = body
        .build(gene! {
            "_n" => 0,
            "$text" => "",
            "_inner" => func!(|this, _args| {
                this.set("$text", "inner ran");
                Value::Null
            }),
            "_outer" => func!(|this, _args| {
                let _ = this.call("_inner", &[]);
                Value::Null
            }),
        })
        .unwrap();
    runtime.tick();

    node.call("_outer", &[]).unwrap();
    let report = runtime.tick();

    // Outer flush drains the queue; the inner one observes it empty
    assert_eq!(report.flushes, vec![1, 0]);
    assert_eq!(node.text_content(), "inner ran");
}

// =============================================================================
// Kind changes and capability gaps
// =============================================================================

#[test]
fn test_kind_change_replaces_node() {
    let (runtime, body) = body();
    let node = body.build(gene! { "$type" => "p", "$text" => "hi" }).unwrap();

    node.set("$type", "h2");
    assert_eq!(runtime.flush(), 1);

    assert!(!node.is_cell());
    let children = body.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].outer_html(), "<h2>hi</h2>");
    assert!(children[0].is_cell());
}

#[test]
fn test_frozen_node_stays_non_reactive() {
    init_tracing();
    let mut doc = MemoryDocument::new();
    let body_id = doc.body().unwrap();
    let frozen = doc.create_element("div");
    doc.set_attribute(frozen, "id", "frozen");
    doc.append_child(body_id, frozen);
    doc.freeze_node(frozen);

    let runtime = Runtime::new(doc);
    let node = runtime
        .body()
        .unwrap()
        .build(gene! { "id" => "frozen", "_n" => 1 })
        .unwrap();

    assert_eq!(node.id(), frozen);
    assert!(!node.is_reactive("_n"));
    node.set("_n", 2);
    assert!(runtime.pending().is_empty());
    assert_eq!(node.get("_n"), Value::from(2));
}

#[test]
fn test_svg_namespace_reaches_children() {
    let (runtime, body) = body();
    let svg = body
        .build(gene! {
            "$type" => "svg",
            "$components" => vec![gene! { "$type" => "circle", "r" => 5 }],
        })
        .unwrap();
    let circle = svg.children()[0].id();
    assert_eq!(
        runtime.with_host(|h| h.namespace(circle)).as_deref(),
        Some(SVG_NAMESPACE)
    );
    assert_eq!(svg.children().len(), 1);
}
