//! Hook registry: bridges OS-level notifications to typed observers.
//!
//! Each observer category (keyboard input, foreground-window change) has at
//! most one underlying OS subscription, installed the first time an observer
//! of that category registers. Raw notifications are queued and fanned out to
//! every registered observer of the category by a dedicated dispatch worker,
//! so the OS callback thread never runs observer code.

pub mod dispatch;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod noop;

use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;

use crate::hooks::dispatch::DispatchLane;

#[cfg(target_os = "windows")]
pub use self::windows::WindowsHookDriver;

#[cfg(not(target_os = "windows"))]
pub use self::noop::NoopHookDriver;

/// Platform-default hook driver type alias.
#[cfg(target_os = "windows")]
pub type PlatformHookDriver = WindowsHookDriver;

/// Platform-default hook driver type alias.
#[cfg(not(target_os = "windows"))]
pub type PlatformHookDriver = NoopHookDriver;

/// Opaque handle to a top-level window, as delivered by the OS notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// One raw keyboard notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Virtual key code.
    pub vk: u32,
    /// Hardware scan code, needed for layout translation.
    pub scan_code: u32,
    /// true for key-down (including system key-down), false for key-up.
    pub pressed: bool,
}

/// One raw foreground-window-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEvent {
    pub window: WindowHandle,
}

/// Observer contract for the keyboard category.
pub trait KeyboardObserver: Send + Sync {
    fn on_key_event(&self, event: &KeyEvent);
}

/// Observer contract for the foreground-window-change category.
pub trait FocusObserver: Send + Sync {
    fn on_focus_change(&self, event: &FocusEvent);
}

/// Errors raised while installing OS subscriptions or their dispatch workers.
///
/// These are setup faults: a missing hook produces silent data loss, so they
/// are fatal for the requesting initialization and never retried silently.
#[derive(Debug)]
pub enum HookError {
    InstallFailed(String),
    WorkerSpawn(String),
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookError::InstallFailed(e) => write!(f, "failed to install OS hook: {e}"),
            HookError::WorkerSpawn(e) => write!(f, "failed to spawn dispatch worker: {e}"),
        }
    }
}

impl std::error::Error for HookError {}

/// Installs the underlying OS subscription for an observer category and wires
/// its raw notifications into the given queue.
///
/// Implementations must guarantee the OS callback only constructs a payload
/// and pushes it without blocking; `try_send` on the bounded queue satisfies
/// this (overflow drops the event rather than stalling the OS thread).
pub trait HookDriver: Send + Sync {
    fn install_keyboard_hook(&self, events: Sender<KeyEvent>) -> Result<(), HookError>;
    fn install_focus_hook(&self, events: Sender<FocusEvent>) -> Result<(), HookError>;
}

impl<T: HookDriver + ?Sized> HookDriver for Arc<T> {
    fn install_keyboard_hook(&self, events: Sender<KeyEvent>) -> Result<(), HookError> {
        (**self).install_keyboard_hook(events)
    }

    fn install_focus_hook(&self, events: Sender<FocusEvent>) -> Result<(), HookError> {
        (**self).install_focus_hook(events)
    }
}

/// Explicitly constructed registry of OS hook subscriptions and their
/// observers. One instance is shared (by `Arc`) with everything that needs to
/// register; there is no process-global hook state.
///
/// Subscriptions live for the process lifetime: unregistering the last
/// observer of a category does not uninstall the OS hook.
pub struct HookRegistry {
    driver: Box<dyn HookDriver>,
    keyboard: Mutex<Option<DispatchLane<KeyEvent, dyn KeyboardObserver>>>,
    focus: Mutex<Option<DispatchLane<FocusEvent, dyn FocusObserver>>>,
}

impl HookRegistry {
    /// Create a registry backed by the platform's hook driver.
    pub fn new() -> Self {
        Self::with_driver(Box::new(PlatformHookDriver::default()))
    }

    /// Create a registry backed by an explicit driver (used by tests).
    pub fn with_driver(driver: Box<dyn HookDriver>) -> Self {
        Self {
            driver,
            keyboard: Mutex::new(None),
            focus: Mutex::new(None),
        }
    }

    /// Register an observer for the keyboard category.
    ///
    /// The first registration installs the OS subscription and starts the
    /// category's dispatch worker; installation failure is fatal for the
    /// caller's initialization.
    pub fn register_keyboard_observer(
        &self,
        observer: Arc<dyn KeyboardObserver>,
    ) -> Result<(), HookError> {
        let mut slot = self.keyboard.lock().unwrap();
        if slot.is_none() {
            let lane = DispatchLane::spawn(
                "keyboard",
                |obs: &(dyn KeyboardObserver + 'static), ev: &KeyEvent| obs.on_key_event(ev),
            )?;
            self.driver.install_keyboard_hook(lane.sender())?;
            *slot = Some(lane);
        }
        if let Some(lane) = slot.as_ref() {
            lane.add(observer);
        }
        Ok(())
    }

    /// Register an observer for the foreground-window-change category.
    pub fn register_focus_observer(
        &self,
        observer: Arc<dyn FocusObserver>,
    ) -> Result<(), HookError> {
        let mut slot = self.focus.lock().unwrap();
        if slot.is_none() {
            let lane = DispatchLane::spawn(
                "focus",
                |obs: &(dyn FocusObserver + 'static), ev: &FocusEvent| obs.on_focus_change(ev),
            )?;
            self.driver.install_focus_hook(lane.sender())?;
            *slot = Some(lane);
        }
        if let Some(lane) = slot.as_ref() {
            lane.add(observer);
        }
        Ok(())
    }

    /// Remove a keyboard observer. The OS subscription stays installed.
    pub fn unregister_keyboard_observer(&self, observer: &Arc<dyn KeyboardObserver>) {
        if let Some(lane) = self.keyboard.lock().unwrap().as_ref() {
            lane.remove(observer);
        }
    }

    /// Remove a focus observer. The OS subscription stays installed.
    pub fn unregister_focus_observer(&self, observer: &Arc<dyn FocusObserver>) {
        if let Some(lane) = self.focus.lock().unwrap().as_ref() {
            lane.remove(observer);
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
