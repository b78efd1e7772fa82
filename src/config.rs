//! Runtime configuration.
//!
//! The frame interval is the fixed-timer fallback for the next-paint callback:
//! a driver that has no paint signal of its own sleeps this long between
//! frames. `max_frames` bounds [`Runtime::run_until_idle`](crate::Runtime::run_until_idle)
//! so a model-update callback that keeps writing cannot spin forever.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default frame interval (~60fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Default frame budget for `run_until_idle`.
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between frames when no paint signal is available.
    pub frame_interval_ms: u64,
    /// Upper bound on frames run by a single `run_until_idle` call.
    pub max_frames: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set the frame interval.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the frame budget.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// The frame interval as a `Duration`.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
