//! Screenshot timing decisions.
//!
//! The decision logic is kept free of threads and OS calls: the screenshot
//! source's loops feed in idle durations and trigger instants, and these
//! helpers answer "pause?" and "debounced?". One monotonic clock
//! (`std::time::Instant`) backs all debounce arithmetic.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Whether a capture tick should be skipped because the user has been idle
/// at least `threshold`. A zero threshold disables the idle pause.
pub(crate) fn should_pause_for_idle(idle: Duration, threshold: Duration) -> bool {
    if threshold.is_zero() {
        return false;
    }
    idle >= threshold
}

/// Minimum-spacing gate for window-change-triggered captures.
///
/// The "last triggered" timestamp is recorded when a trigger is accepted,
/// before the post-change capture delay, so rapid window switching is
/// measured switch-to-switch.
pub(crate) struct DebounceGate {
    window: Duration,
    last_triggered: Mutex<Option<Instant>>,
}

impl DebounceGate {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_triggered: Mutex::new(None),
        }
    }

    /// Accept or suppress a trigger occurring at `now`.
    pub(crate) fn try_trigger_at(&self, now: Instant) -> bool {
        let mut last = self.last_triggered.lock().unwrap();
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.window {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    pub(crate) fn try_trigger(&self) -> bool {
        self.try_trigger_at(Instant::now())
    }
}
