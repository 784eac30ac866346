//! Activity Recorder - desktop activity capture for LLM consumption.
//!
//! This library captures a user's desktop activity — keystrokes, foreground
//! window changes, periodic screenshots — and serializes it into a single
//! chronological, LLM-friendly activity log.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Activity Recorder                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  OS hook ──▶ ┌──────────────┐    ┌─────────────────────┐     │
//! │  callbacks   │ HookRegistry │──▶ │ Dispatch loop       │     │
//! │              │ (1 sub per   │    │ (1 worker per       │     │
//! │              │  category)   │    │  category, FIFO)    │     │
//! │              └──────────────┘    └──────────┬──────────┘     │
//! │                                             ▼                │
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────────────┐       │
//! │  │ Keystroke │  │ WindowFocus  │  │ Screenshot       │       │
//! │  │ source    │  │ source       │  │ source (timing + │       │
//! │  └─────┬─────┘  └──────┬───────┘  │  serialization)  │       │
//! │        │               │          └────────┬─────────┘       │
//! │        ▼               ▼                   ▼                 │
//! │  ┌──────────────────────────────────────────────────┐        │
//! │  │ EventSink (buffered, threshold flush, one file)  │        │
//! │  └──────────────────────────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The OS callback thread never runs observer code: hook procedures push an
//! immutable payload onto the category's queue and return. A dedicated
//! dispatch worker per category invokes every registered observer in
//! arrival order. Capture sources hold the sink through a `Weak` reference
//! so sink and source teardown can race safely.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use activity_recorder::{
//!     EventSink, HookRegistry, KeystrokeSource, SessionStats,
//!     platform::PlatformKeyTranslator, sink::DEFAULT_FLUSH_THRESHOLD,
//! };
//!
//! let stats = SessionStats::shared();
//! let registry = Arc::new(HookRegistry::new());
//! let sink = EventSink::create("activity.log".as_ref(), DEFAULT_FLUSH_THRESHOLD, stats.clone())
//!     .expect("cannot open activity log");
//!
//! let keystrokes = Arc::new(KeystrokeSource::new(
//!     registry.clone(),
//!     Arc::new(PlatformKeyTranslator::default()),
//!     stats,
//! ));
//! sink.add_source(keystrokes).expect("keyboard hook failed");
//! // ... run until shutdown, then:
//! sink.shutdown();
//! ```

pub mod config;
pub mod encoder;
pub mod hooks;
pub mod platform;
pub mod sink;
pub mod sources;
pub mod stats;
pub mod timefmt;

// Re-export key types at crate root for convenience
pub use config::{OutputMode, RecorderConfig, SourceToggles, TimingMode};
pub use hooks::{
    FocusEvent, FocusObserver, HookDriver, HookError, HookRegistry, KeyEvent, KeyboardObserver,
    WindowHandle,
};
pub use sink::{EventSink, SinkError};
pub use sources::{
    CaptureSource, KeystrokeSource, ScreenshotSource, ScreenshotSourceBuilder, SetupError,
    TimingStrategy, WindowFocusSource,
};
pub use stats::{SessionStats, SharedSessionStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
