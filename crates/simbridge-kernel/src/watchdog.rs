//! [`Watchdog`] – task liveness monitor.
//!
//! Every long-running task (the arbitration loop, each periodic publisher)
//! is registered once and receives a [`Heartbeat`] handle.  The task calls
//! [`Heartbeat::beat`] on every iteration; the handle is lock-free so it can
//! move onto any thread or async task.
//!
//! The supervisor keeps the [`Watchdog`] itself and calls
//! [`Watchdog::check_all`] to obtain the names of tasks that have been silent
//! for longer than their timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Health state reported for a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskHealth {
    /// The task has beaten within its timeout.
    Healthy,
    /// The task has been silent for longer than its timeout.
    TimedOut,
}

/// Handle a task uses to report that it is still making progress.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    epoch: Instant,
    last_beat_ms: Arc<AtomicU64>,
}

impl Heartbeat {
    /// Record progress now.
    pub fn beat(&self) {
        self.last_beat_ms
            .store(millis_since(self.epoch), Ordering::Relaxed);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal entry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct TaskEntry {
    name: String,
    timeout: Duration,
    last_beat_ms: Arc<AtomicU64>,
}

fn millis_since(epoch: Instant) -> u64 {
    u64::try_from(epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

/// Tracks heartbeats from registered tasks and detects frozen ones.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use simbridge_kernel::watchdog::{TaskHealth, Watchdog};
///
/// let mut wd = Watchdog::new();
/// let heartbeat = wd.register("pandaStates", Duration::from_secs(1));
/// heartbeat.beat();
///
/// assert_eq!(wd.health("pandaStates"), TaskHealth::Healthy);
/// ```
#[derive(Debug)]
pub struct Watchdog {
    epoch: Instant,
    tasks: Vec<TaskEntry>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Create an empty watchdog with no registered tasks.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            tasks: Vec::new(),
        }
    }

    /// Register `name` with a maximum silence of `timeout`.
    ///
    /// The task counts as having beaten at registration time.  Registering a
    /// name twice replaces the earlier entry; its old handle stops counting.
    pub fn register(&mut self, name: &str, timeout: Duration) -> Heartbeat {
        let last_beat_ms = Arc::new(AtomicU64::new(millis_since(self.epoch)));
        self.tasks.retain(|entry| entry.name != name);
        debug!(task = name, timeout_ms = timeout.as_millis() as u64, "task registered");
        self.tasks.push(TaskEntry {
            name: name.to_string(),
            timeout,
            last_beat_ms: Arc::clone(&last_beat_ms),
        });
        Heartbeat {
            epoch: self.epoch,
            last_beat_ms,
        }
    }

    /// Return the [`TaskHealth`] of `name`.
    ///
    /// Returns [`TaskHealth::TimedOut`] for unknown tasks.
    pub fn health(&self, name: &str) -> TaskHealth {
        let now = millis_since(self.epoch);
        match self.tasks.iter().find(|entry| entry.name == name) {
            Some(entry) if !Self::is_silent(entry, now) => TaskHealth::Healthy,
            _ => TaskHealth::TimedOut,
        }
    }

    /// Names of all tasks silent for longer than their timeout, in
    /// registration order.
    pub fn check_all(&self) -> Vec<String> {
        let now = millis_since(self.epoch);
        self.tasks
            .iter()
            .filter(|entry| Self::is_silent(entry, now))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn is_silent(entry: &TaskEntry, now_ms: u64) -> bool {
        let last = entry.last_beat_ms.load(Ordering::Relaxed);
        Duration::from_millis(now_ms.saturating_sub(last)) > entry.timeout
    }
}
