//! Capture sources: pluggable units that turn observed events (or timed
//! polling) into formatted log tokens.
//!
//! Lifecycle: a source is created inactive, becomes active when a sink hands
//! it a non-owning reference through `initialize`, and returns to inactive
//! via `uninitialize`. Sources never hold the sink strongly — teardown of
//! the sink and of a source may race, and a source that outlives the sink
//! skips emission instead of faulting.

pub mod keystroke;
pub mod screenshot;
pub mod serialize;
pub mod timing;
pub mod window_focus;

use std::sync::Weak;

use crate::hooks::HookError;
use crate::sink::EventSink;

pub use keystroke::KeystrokeSource;
pub use screenshot::{ScreenshotConfig, ScreenshotSource, ScreenshotSourceBuilder, TimingStrategy};
pub use serialize::SerializationStrategy;
pub use window_focus::WindowFocusSource;

/// A unit of capture logic feeding one event sink.
pub trait CaptureSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Activate the source. Called by the sink with a non-owning reference
    /// to itself. Setup faults are fatal for the caller.
    fn initialize(&self, sink: Weak<EventSink>) -> Result<(), SetupError>;

    /// Deactivate the source: stop background work, unregister observers,
    /// and drop the sink reference. Idempotent.
    fn uninitialize(&self);
}

/// Setup faults raised while activating a capture source.
#[derive(Debug)]
pub enum SetupError {
    /// The source is already active; a source activates at most once at a
    /// time.
    AlreadyActive(&'static str),
    /// Installing the OS subscription failed.
    Hook(HookError),
    /// Filesystem or thread setup failed.
    Io(String),
    /// The source was built with an invalid configuration.
    InvalidConfig(String),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::AlreadyActive(name) => {
                write!(f, "capture source '{name}' is already active")
            }
            SetupError::Hook(e) => write!(f, "{e}"),
            SetupError::Io(e) => write!(f, "source setup failed: {e}"),
            SetupError::InvalidConfig(e) => write!(f, "invalid source configuration: {e}"),
        }
    }
}

impl std::error::Error for SetupError {}

impl From<HookError> for SetupError {
    fn from(e: HookError) -> Self {
        SetupError::Hook(e)
    }
}
