use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::conditions::POLL_INTERVAL;
use crate::config::models::{Namespace, Settings};
use crate::driver::WindowInfo;

/// Mutable state threaded through a whole run.
pub struct RunContext {
    /// Window the run is bound to; window-relative positions add its
    /// origin. `None` means full-display addressing.
    pub window: Option<WindowInfo>,

    /// Named coordinate namespace, keyed by point name.
    pub coordinates: Namespace,

    /// Count of successfully executed nodes, nested ones included.
    pub executed: usize,

    /// When the run loop started; the budget counts from here.
    pub started: Instant,

    /// Global time budget. Zero disables it.
    pub budget: Duration,

    /// Cooperative cancellation flag, checked before every node and
    /// inside every polling loop.
    pub cancel: CancellationToken,

    /// Post-action delay for nodes without their own `wait`.
    pub default_wait: Duration,

    /// Capture a diagnostic screenshot when a node fails.
    pub screenshot_on_error: bool,

    /// Trail of finished top-level nodes, newest last.
    pub history: Vec<HistoryEntry>,
}

impl RunContext {
    pub fn new(settings: &Settings, cancel: CancellationToken) -> Self {
        Self {
            window: None,
            coordinates: Namespace::new(),
            executed: 0,
            started: Instant::now(),
            budget: duration_from_secs(settings.max_runtime),
            cancel,
            default_wait: duration_from_secs(settings.default_wait),
            screenshot_on_error: settings.screenshot_on_error,
            history: Vec::new(),
        }
    }

    /// Bind the run to a window.
    pub fn with_window(mut self, window: Option<WindowInfo>) -> Self {
        self.window = window;
        self
    }

    /// Install the coordinate namespace.
    pub fn with_coordinates(mut self, coordinates: Namespace) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once the global budget is spent. A zero budget never trips.
    pub fn over_budget(&self) -> bool {
        !self.budget.is_zero() && self.elapsed() > self.budget
    }

    /// Sleep in short slices so cancellation stays responsive. Returns
    /// false when the sleep was cut short by cancellation.
    pub(crate) fn sleep_cancellable(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

/// One finished top-level node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Kind tag of the node, as it appears in scripts.
    pub action: String,
    /// The node's comment, when present.
    pub comment: Option<String>,
    /// RFC 3339 completion time.
    pub timestamp: String,
    pub outcome: StepOutcome,
}

/// How a single node finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ran to completion.
    Completed,
    /// A best-effort wait gave up; the run proceeds regardless.
    TimedOut,
    /// Cancellation surfaced while the node was running.
    Interrupted,
}

/// Seconds-as-f64 from script documents into a Duration. Negative, NaN
/// and infinite values clamp to zero instead of panicking.
pub(crate) fn duration_from_secs(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}
