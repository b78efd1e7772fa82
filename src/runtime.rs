//! Runtime - the context every live node shares.
//!
//! A [`Runtime`] owns the host tree, the cell registry and the scheduler.
//! It is a cheap `Rc` handle; callables stored inside cells only keep a
//! [`WeakRuntime`] so dropping the last handle frees everything.
//!
//! Borrows of the host, the registry and the scheduler are always scoped to a
//! single helper call and never held while user callables run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::config::Config;
use crate::engine::CellState;
use crate::error::{Error, Result};
use crate::host::{Host, NodeId};
use crate::node::Node;
use crate::pipeline::scheduler::{self, FrameReport, FrameTask, Scheduler};
use crate::value::Value;

pub(crate) struct Inner {
    host: RefCell<Box<dyn Host>>,
    cells: RefCell<HashMap<NodeId, CellState>>,
    scheduler: RefCell<Scheduler>,
    config: Config,
}

/// Shared handle to a host tree and its reactive state.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<Inner>,
}

/// Non-owning runtime handle held by bound callables.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<Inner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("cells", &self.cell_count())
            .field("pending", &self.pending().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Runtime {
    /// Runtime over `host` with the default configuration.
    pub fn new(host: impl Host + 'static) -> Self {
        Self::with_config(host, Config::default())
    }

    pub fn with_config(host: impl Host + 'static, config: Config) -> Self {
        Self {
            inner: Rc::new(Inner {
                host: RefCell::new(Box::new(host)),
                cells: RefCell::new(HashMap::new()),
                scheduler: RefCell::new(Scheduler::default()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Handle for any host node, live cell or not.
    pub fn node(&self, id: NodeId) -> Node {
        Node::new(self.clone(), id)
    }

    /// Handle for a live cell.
    pub fn cell_node(&self, id: NodeId) -> Result<Node> {
        if self.is_cell(id) {
            Ok(self.node(id))
        } else {
            Err(Error::UnknownNode(id))
        }
    }

    /// The document body.
    pub fn body(&self) -> Result<Node> {
        self.with_host(|host| host.body())
            .map(|id| self.node(id))
            .ok_or(Error::NoDocumentBody)
    }

    /// Read access to the host tree.
    pub fn with_host<R>(&self, f: impl FnOnce(&dyn Host) -> R) -> R {
        let host = self.inner.host.borrow();
        f(host.as_ref())
    }

    /// Write access to the host tree. Writes made here bypass reactivity.
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut dyn Host) -> R) -> R {
        let mut host = self.inner.host.borrow_mut();
        f(host.as_mut())
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Run the frame tasks queued before this call.
    pub fn tick(&self) -> FrameReport {
        scheduler::tick(self)
    }

    /// Flush the Pending-Work Set now, without waiting for a frame.
    /// Returns the number of nodes processed.
    pub fn flush(&self) -> usize {
        scheduler::flush(self)
    }

    /// Tick until no frame task remains or the frame budget runs out.
    /// Returns the number of frames ticked.
    pub fn run_until_idle(&self) -> usize {
        let budget = self.inner.config.max_frames;
        let mut frames = 0;
        while !self.is_idle() {
            if frames >= budget {
                warn!(frames, "frame budget exhausted with work still queued");
                break;
            }
            self.tick();
            frames += 1;
        }
        frames
    }

    /// Whether no frame task is queued.
    pub fn is_idle(&self) -> bool {
        self.inner.scheduler.borrow().is_idle()
    }

    /// Nodes touched since the last flush, in first-touched order.
    pub fn pending(&self) -> Vec<NodeId> {
        self.inner.scheduler.borrow().pending()
    }

    /// Number of live cells.
    pub fn cell_count(&self) -> usize {
        self.inner.cells.borrow().len()
    }

    /// Invoke the handler the host holds for `name` on `id`.
    pub fn dispatch(&self, id: NodeId, name: &str, args: &[Value]) -> Result<Value> {
        let handler = self.with_host(|host| host.handler(id, name));
        match handler {
            Some(handler) => Ok(handler.call(&self.node(id), args)),
            None => Err(Error::NotCallable(name.to_string())),
        }
    }

    // =========================================================================
    // Crate internals
    // =========================================================================

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub(crate) fn schedule(&self, task: FrameTask) {
        self.inner.scheduler.borrow_mut().push_task(task);
    }

    pub(crate) fn with_scheduler<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        f(&mut self.inner.scheduler.borrow_mut())
    }

    pub(crate) fn is_cell(&self, id: NodeId) -> bool {
        self.inner.cells.borrow().contains_key(&id)
    }

    pub(crate) fn cell<R>(&self, id: NodeId, f: impl FnOnce(&CellState) -> R) -> Option<R> {
        self.inner.cells.borrow().get(&id).map(f)
    }

    pub(crate) fn cell_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut CellState) -> R) -> Option<R> {
        self.inner.cells.borrow_mut().get_mut(&id).map(f)
    }

    pub(crate) fn with_cells<R>(&self, f: impl FnOnce(&mut HashMap<NodeId, CellState>) -> R) -> R {
        f(&mut self.inner.cells.borrow_mut())
    }
}
