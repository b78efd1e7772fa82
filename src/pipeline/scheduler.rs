//! Mutation Scheduler - batching touches into frames.
//!
//! The scheduler holds two queues:
//!
//! - the Pending-Work Set: nodes touched since the last flush, first-touched first
//! - the frame task queue: work deferred to the next frame (flushes and
//!   initializer runs), standing in for a next-paint callback
//!
//! # Flush protocol
//!
//! ```text
//! bound call ─┬─> queue FrameTask::Flush
//!             └─> run original now (touches accumulate)
//! next tick  ───> flush: for each pending node, for each dirty key,
//!                 apply if freeze(live) != snapshot, then $update if a
//!                 private key changed
//! ```
//!
//! Several bound calls in one frame queue several flushes. The first one
//! drains the Pending-Work Set, so the rest process nothing.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::{debug, debug_span, trace};

use crate::engine::{dirty, store};
use crate::gene::{self as keys, INIT, TRACKED, UPDATE};
use crate::host::NodeId;
use crate::renderer::apply;
use crate::runtime::Runtime;
use crate::value::{freeze, Callable, Value};

// =============================================================================
// Queues
// =============================================================================

/// Work deferred to the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTask {
    /// Process the Pending-Work Set.
    Flush,
    /// Run the node's initializer.
    Init(NodeId),
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Nodes processed by each flush, in run order.
    pub flushes: Vec<usize>,
    /// Initializers run.
    pub inits: usize,
}

impl FrameReport {
    /// Total nodes processed across all flushes.
    pub fn processed(&self) -> usize {
        self.flushes.iter().sum()
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: IndexSet<NodeId>,
    tasks: VecDeque<FrameTask>,
}

impl Scheduler {
    /// Add a node to the Pending-Work Set. Returns `true` if it was not there.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.pending.insert(id)
    }

    pub fn remove(&mut self, id: NodeId) {
        self.pending.shift_remove(&id);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.pending.contains(&id)
    }

    pub fn pending(&self) -> Vec<NodeId> {
        self.pending.iter().copied().collect()
    }

    pub fn push_task(&mut self, task: FrameTask) {
        self.tasks.push_back(task);
    }

    /// Take every task queued so far.
    pub fn take_tasks(&mut self) -> Vec<FrameTask> {
        self.tasks.drain(..).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Bind a callable to the cell at `id`.
///
/// The wrapper queues a flush for the next frame, then runs the original
/// immediately with the cell as receiver. Non-callables pass through.
pub fn bind(runtime: &Runtime, id: NodeId, value: Value) -> Value {
    let Value::Function(callable) = value else {
        return value;
    };
    let weak = runtime.downgrade();
    let original = callable.original().clone();
    let bound = Callable::wrap(&callable, move |this, args| match weak.upgrade() {
        Some(runtime) => {
            runtime.schedule(FrameTask::Flush);
            original.call(&runtime.node(id), args)
        }
        None => original.call(this, args),
    });
    Value::Function(bound)
}

// =============================================================================
// Accessors
// =============================================================================

/// Install the intercepted accessor for `key` on `id`.
///
/// Hosts that refuse redefinition leave the key non-reactive; the node keeps
/// using plain host properties for it.
pub fn define_reactive(runtime: &Runtime, id: NodeId, key: &str) -> bool {
    if !runtime.with_host(|host| host.allows_redefinition(id)) {
        debug!(node = id.0, key, "host refused accessor definition");
        return false;
    }
    runtime
        .cell_mut(id, |state| {
            state.reactive.insert(key.to_string());
        })
        .is_some()
}

/// Install accessors for the tracked keys, the inherited keys and every
/// key in the store.
pub fn define_all(runtime: &Runtime, id: NodeId) {
    let (inheritance, own) = runtime
        .cell(id, |state| {
            (state.inheritance.clone(), state.store.keys().cloned().collect::<Vec<_>>())
        })
        .unwrap_or_default();

    let keys = TRACKED
        .iter()
        .map(|key| key.to_string())
        .chain(inheritance)
        .chain(own);
    for key in keys {
        define_reactive(runtime, id, &key);
    }
}

// =============================================================================
// Flush
// =============================================================================

/// Process the Pending-Work Set. Returns the number of nodes processed.
pub fn flush(runtime: &Runtime) -> usize {
    let _span = debug_span!("flush").entered();
    let batch = runtime.with_scheduler(|scheduler| scheduler.pending());
    let mut processed = 0;

    for id in batch {
        // Released by an earlier node's reconciliation
        if !runtime.with_scheduler(|scheduler| scheduler.contains(id)) {
            continue;
        }
        if !runtime.is_cell(id) {
            runtime.with_scheduler(|scheduler| scheduler.remove(id));
            continue;
        }
        processed += 1;

        // Touches made while applying or updating start a fresh record
        let record = dirty::take(runtime, id).unwrap_or_default();
        let mut needs_update = false;
        for (key, snapshot) in record {
            let current = store::peek(runtime, id, &key);
            if current.as_ref().map(freeze) == snapshot {
                continue;
            }
            trace!(node = id.0, key = key.as_str(), "changed");
            apply::apply(runtime, id, &key, &current.unwrap_or_default());
            if keys::is_private(&key) {
                needs_update = true;
            }
            // A kind change swaps the node out
            if !runtime.is_cell(id) {
                break;
            }
        }

        if runtime.is_cell(id) {
            let has_update = matches!(store::peek(runtime, id, UPDATE), Some(Value::Function(_)));
            if needs_update && has_update {
                apply::run_update(runtime, id);
            }
            dirty::clear(runtime, id);
        }
        runtime.with_scheduler(|scheduler| scheduler.remove(id));
    }

    debug!(processed, "flush complete");
    processed
}

/// Run the frame tasks queued before this call. Tasks queued while they run
/// wait for the next tick.
pub fn tick(runtime: &Runtime) -> FrameReport {
    let tasks = runtime.with_scheduler(Scheduler::take_tasks);
    let mut report = FrameReport::default();

    for task in tasks {
        match task {
            FrameTask::Flush => report.flushes.push(flush(runtime)),
            FrameTask::Init(id) => {
                if run_init(runtime, id) {
                    report.inits += 1;
                }
            }
        }
    }
    report
}

/// Invoke the cell's initializer, bound so its writes schedule a flush.
fn run_init(runtime: &Runtime, id: NodeId) -> bool {
    let Some(init) = store::peek(runtime, id, INIT) else {
        return false;
    };
    let Value::Function(bound) = bind(runtime, id, init) else {
        return false;
    };
    bound.call(&runtime.node(id), &[]);
    true
}
