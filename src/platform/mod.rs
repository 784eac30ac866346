//! Platform collaborator interfaces.
//!
//! The capture sources consume a handful of OS capabilities — frame
//! grabbing, window/monitor resolution, global idle time, keyboard-layout
//! translation — through these traits so the capture logic stays testable
//! and platform-neutral. Windows provides real implementations; everywhere
//! else the inert noop versions let the crate compile and run.

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod noop;

use crate::hooks::WindowHandle;

#[cfg(target_os = "windows")]
pub use self::windows::{GdiFrameGrabber, LayoutKeyTranslator, WinDesktopQuery, WinIdleQuery};

#[cfg(not(target_os = "windows"))]
pub use self::noop::{NoopDesktopQuery, NoopFrameGrabber, NoopIdleQuery, NoopKeyTranslator};

/// Platform-default implementations.
#[cfg(target_os = "windows")]
pub type PlatformFrameGrabber = GdiFrameGrabber;
#[cfg(target_os = "windows")]
pub type PlatformDesktopQuery = WinDesktopQuery;
#[cfg(target_os = "windows")]
pub type PlatformIdleQuery = WinIdleQuery;
#[cfg(target_os = "windows")]
pub type PlatformKeyTranslator = LayoutKeyTranslator;

/// Platform-default implementations.
#[cfg(not(target_os = "windows"))]
pub type PlatformFrameGrabber = NoopFrameGrabber;
#[cfg(not(target_os = "windows"))]
pub type PlatformDesktopQuery = NoopDesktopQuery;
#[cfg(not(target_os = "windows"))]
pub type PlatformIdleQuery = NoopIdleQuery;
#[cfg(not(target_os = "windows"))]
pub type PlatformKeyTranslator = NoopKeyTranslator;

/// A rectangular screen region in virtual-desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A raw captured frame.
///
/// Grabbers deliver tightly packed rows in BGR channel order (the native GDI
/// layout); the screenshot source converts to the serialization strategy's
/// expected order before handing the frame on.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// Transient capture faults. Logged and skipped, never fatal.
#[derive(Debug)]
pub enum CaptureError {
    Grab(String),
    Encode(String),
    Unsupported,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Grab(e) => write!(f, "frame grab failed: {e}"),
            CaptureError::Encode(e) => write!(f, "frame encode failed: {e}"),
            CaptureError::Unsupported => write!(f, "capture not supported on this platform"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Grabs the raw pixel contents of a screen region.
pub trait FrameGrabber: Send + Sync {
    fn grab(&self, bounds: Bounds) -> Result<Frame, CaptureError>;
}

/// Resolves window handles to titles and monitor geometry.
pub trait DesktopQuery: Send + Sync {
    fn foreground_window(&self) -> Option<WindowHandle>;
    fn window_title(&self, window: WindowHandle) -> Option<String>;
    fn monitor_bounds(&self, window: WindowHandle) -> Option<Bounds>;
}

/// Reports how long the user has been idle (no keyboard or mouse input).
pub trait IdleQuery: Send + Sync {
    fn idle_millis(&self) -> u64;
}

/// Maps a (virtual key, scan code) pair to the characters it would type
/// under the active keyboard layout and modifier state.
pub trait KeyTranslator: Send + Sync {
    fn translate(&self, vk: u32, scan_code: u32) -> Option<String>;
}

/// Milliseconds elapsed from `earlier` to `current` on a 32-bit tick
/// counter. The counter wraps roughly every 49.7 days; wrapping subtraction
/// stays correct across the wrap.
pub fn ticks_since(current: u32, earlier: u32) -> u32 {
    current.wrapping_sub(earlier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_since_plain() {
        assert_eq!(ticks_since(1_000, 400), 600);
    }

    #[test]
    fn ticks_since_handles_counter_wraparound() {
        assert_eq!(ticks_since(5, u32::MAX - 10), 16);
        assert_eq!(ticks_since(0, u32::MAX), 1);
    }
}
