//! Non-Windows (noop) implementations of the platform interfaces.
//!
//! These keep the crate compiling and runnable on non-Windows targets; they
//! never resolve windows, never grab frames, and translate no keys. Tests
//! exercise the capture logic through their own mock implementations.

use crate::hooks::WindowHandle;
use crate::platform::{
    Bounds, CaptureError, DesktopQuery, Frame, FrameGrabber, IdleQuery, KeyTranslator,
};

/// A desktop query that resolves nothing.
#[derive(Default)]
pub struct NoopDesktopQuery;

impl DesktopQuery for NoopDesktopQuery {
    fn foreground_window(&self) -> Option<WindowHandle> {
        None
    }

    fn window_title(&self, _window: WindowHandle) -> Option<String> {
        None
    }

    fn monitor_bounds(&self, _window: WindowHandle) -> Option<Bounds> {
        None
    }
}

/// A frame grabber that always fails with `Unsupported`.
#[derive(Default)]
pub struct NoopFrameGrabber;

impl FrameGrabber for NoopFrameGrabber {
    fn grab(&self, _bounds: Bounds) -> Result<Frame, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

/// An idle query that always reports activity.
#[derive(Default)]
pub struct NoopIdleQuery;

impl IdleQuery for NoopIdleQuery {
    fn idle_millis(&self) -> u64 {
        0
    }
}

/// A key translator that produces no characters.
#[derive(Default)]
pub struct NoopKeyTranslator;

impl KeyTranslator for NoopKeyTranslator {
    fn translate(&self, _vk: u32, _scan_code: u32) -> Option<String> {
        None
    }
}
