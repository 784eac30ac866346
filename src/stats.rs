//! Session statistics.
//!
//! Counts what the recorder has done this session — events dispatched,
//! screenshots taken or skipped, sink flushes — so shutdown can print an
//! auditable summary. Counters are atomic; every component shares one
//! instance through an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Atomic counters for the current recording session.
#[derive(Debug)]
pub struct SessionStats {
    key_events: AtomicU64,
    focus_events: AtomicU64,
    screenshots_captured: AtomicU64,
    screenshots_skipped: AtomicU64,
    sink_flushes: AtomicU64,
    bytes_written: AtomicU64,
    session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            key_events: AtomicU64::new(0),
            focus_events: AtomicU64::new(0),
            screenshots_captured: AtomicU64::new(0),
            screenshots_skipped: AtomicU64::new(0),
            sink_flushes: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Create a shareable stats handle.
    pub fn shared() -> SharedSessionStats {
        Arc::new(Self::new())
    }

    pub fn record_key_event(&self) {
        self.key_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_focus_event(&self) {
        self.focus_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_screenshot(&self) {
        self.screenshots_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_screenshot_skipped(&self) {
        self.screenshots_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, bytes: u64) {
        self.sink_flushes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            key_events: self.key_events.load(Ordering::Relaxed),
            focus_events: self.focus_events.load(Ordering::Relaxed),
            screenshots_captured: self.screenshots_captured.load(Ordering::Relaxed),
            screenshots_skipped: self.screenshots_skipped.load(Ordering::Relaxed),
            sink_flushes: self.sink_flushes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Summary string for display at shutdown.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Keyboard events dispatched: {}\n\
             - Window changes dispatched: {}\n\
             - Screenshots captured: {}\n\
             - Screenshots skipped: {}\n\
             - Log flushes: {} ({} bytes)\n\
             - Session duration: {} seconds",
            s.key_events,
            s.focus_events,
            s.screenshots_captured,
            s.screenshots_skipped,
            s.sink_flushes,
            s.bytes_written,
            s.session_duration_secs
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the session counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub key_events: u64,
    pub focus_events: u64,
    pub screenshots_captured: u64,
    pub screenshots_skipped: u64,
    pub sink_flushes: u64,
    pub bytes_written: u64,
    pub session_duration_secs: u64,
}

/// Thread-safe shared stats handle.
pub type SharedSessionStats = Arc<SessionStats>;
