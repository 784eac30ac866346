//! Non-Windows (noop) hook driver.
//!
//! This exists so the crate (and binary) can compile on non-Windows targets
//! without the Windows hook APIs. No OS subscriptions are installed and no
//! events are ever produced; the dispatch engine itself still works and can
//! be driven by tests through a custom [`HookDriver`].

use crossbeam_channel::Sender;
use tracing::warn;

use crate::hooks::{FocusEvent, HookDriver, HookError, KeyEvent};

/// A hook driver that installs nothing and never emits events.
#[derive(Default)]
pub struct NoopHookDriver;

impl HookDriver for NoopHookDriver {
    fn install_keyboard_hook(&self, _events: Sender<KeyEvent>) -> Result<(), HookError> {
        warn!("keyboard capture is not supported on this platform; no events will be recorded");
        Ok(())
    }

    fn install_focus_hook(&self, _events: Sender<FocusEvent>) -> Result<(), HookError> {
        warn!("window-focus capture is not supported on this platform; no events will be recorded");
        Ok(())
    }
}
