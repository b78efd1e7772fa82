//! Mount API - bootstrap and frame loop.
//!
//! This module provides the entry point for mounting descriptions found in a
//! namespace record. Every entry carrying `$cell` is built into the document
//! body; the frame loop then drives flushes and initializers.
//!
//! # Example
//!
//! ```ignore
//! use spark_cell::pipeline::mount;
//!
//! let app = gene! {
//!     "app" => gene! { "$cell" => true, "$type" => "body", "$components" => vec![..] },
//! };
//!
//! // Mount the application
//! let handle = mount::mount(MemoryDocument::new(), &app)?;
//!
//! // Option 1: Run the blocking frame loop until idle or stopped
//! mount::run(&handle);
//!
//! // Option 2: Tick manually in your own loop
//! while mount::tick(&handle) {
//!     // Your logic here
//! }
//!
//! // Clean up
//! handle.unmount();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info};

use crate::config::Config;
use crate::engine::registry;
use crate::error::{Error, Result};
use crate::gene as keys;
use crate::host::Host;
use crate::node::Node;
use crate::runtime::Runtime;
use crate::value::{Gene, Value};

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`create`] and [`mount`].
///
/// Holds the runtime, the mounted root cells and the running flag.
pub struct MountHandle {
    runtime: Runtime,
    cells: Vec<Node>,
    running: Arc<AtomicBool>,
}

impl MountHandle {
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Root cells, in namespace order.
    pub fn cells(&self) -> &[Node] {
        &self.cells
    }

    /// Check if still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the frame loop. Can be called from another thread through
    /// [`MountHandle::running_flag`].
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Shared running flag.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Stop and release the mounted cells. The host tree keeps its content.
    pub fn unmount(self) {
        self.stop();
        for cell in &self.cells {
            registry::release(&self.runtime, cell.id());
        }
        self.runtime.with_scheduler(|scheduler| scheduler.take_tasks());
        debug!(cells = self.cells.len(), "unmounted");
    }
}

// =============================================================================
// Bootstrap
// =============================================================================

/// Wrap a host in a runtime.
pub fn prepare(host: impl Host + 'static, config: Config) -> Runtime {
    Runtime::with_config(host, config)
}

/// Descriptions in `namespace` marked with `$cell`. Entries that are not
/// records are skipped.
pub fn detect(namespace: &Gene) -> Vec<Gene> {
    namespace
        .values()
        .filter_map(Value::as_object)
        .filter(|gene| keys::is_cell(gene))
        .cloned()
        .collect()
}

/// Build every detected description into the document body.
pub fn create(runtime: &Runtime, namespace: &Gene) -> Result<MountHandle> {
    let body = runtime.body()?;
    let cells = detect(namespace)
        .into_iter()
        .map(|gene| body.build(gene))
        .collect::<Result<Vec<_>>>()?;
    info!(cells = cells.len(), "mounted");

    Ok(MountHandle {
        runtime: runtime.clone(),
        cells,
        running: Arc::new(AtomicBool::new(true)),
    })
}

/// [`prepare`] with the default configuration, then [`create`].
pub fn mount(host: impl Host + 'static, namespace: &Gene) -> Result<MountHandle> {
    let runtime = prepare(host, Config::default());
    create(&runtime, namespace)
}

// =============================================================================
// Frame Loop
// =============================================================================

/// Run one frame (non-blocking).
///
/// Returns `false` once the handle was stopped.
pub fn tick(handle: &MountHandle) -> bool {
    if !handle.is_running() {
        return false;
    }
    handle.runtime.tick();
    handle.is_running()
}

/// Run frames until no work is queued, the handle is stopped or the frame
/// budget runs out, sleeping the frame interval between frames.
pub fn run(handle: &MountHandle) -> usize {
    let interval = handle.runtime.config().frame_interval();
    let budget = handle.runtime.config().max_frames;
    let mut frames = 0;

    while !handle.runtime.is_idle() && frames < budget {
        if !tick(handle) {
            break;
        }
        frames += 1;
        if !handle.runtime.is_idle() {
            thread::sleep(interval);
        }
    }
    frames
}

/// Stop the frame loop and release the mounted cells.
pub fn unmount(handle: MountHandle) {
    handle.unmount();
}

// =============================================================================
// Tests
// =============================================================================
