//! Reactive Pipeline
//!
//! This module implements the update cycle that connects store mutations to
//! host-tree presentation.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Node::set / container read → Pending-Work Set + Dirty record → FrameTask::Flush → apply / $update
//! ```
//!
//! ## Data Flow
//!
//! 1. **touch** - intercepted reads and writes record pre-cycle snapshots
//! 2. **bind** - every stored callable queues a flush when called
//! 3. **flush** - changed keys are painted; private-key changes run `$update`
//!
//! ## Key Design Principles
//!
//! - **Explicit scheduler**: the queues live on the [`Runtime`](crate::Runtime), never in globals
//! - **Deferred presentation**: only public keys reach the host synchronously
//! - **Explicit flush**: tests drive frames with `tick`/`flush` instead of timers

pub mod mount;
pub mod scheduler;

// Re-exports
pub use mount::{create, detect, mount, prepare, run, tick, unmount, MountHandle};
pub use scheduler::{bind, define_reactive, FrameReport, FrameTask};
