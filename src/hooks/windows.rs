//! Windows hook driver.
//!
//! Installs the process's OS subscriptions: a WH_KEYBOARD_LL hook for the
//! keyboard category and an EVENT_SYSTEM_FOREGROUND WinEvent hook for the
//! focus category. Low-level hooks and out-of-context WinEvents both fire on
//! the thread that installed them, so each category gets a dedicated thread
//! that installs the hook and then pumps messages for the process lifetime.
//! The hook procedures only construct a payload and push it onto the
//! category's queue; they never run observer code.

use std::cell::RefCell;
use std::thread;

use crossbeam_channel::{bounded, Sender};
use tracing::info;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::Accessibility::{SetWinEventHook, HWINEVENTHOOK};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, SetWindowsHookExW, EVENT_SYSTEM_FOREGROUND, HHOOK,
    KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WINEVENT_OUTOFCONTEXT, WM_KEYDOWN, WM_KEYUP,
    WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use crate::hooks::{FocusEvent, HookDriver, HookError, KeyEvent, WindowHandle};

// The hook procedures run on the thread that installed the hook, so a
// thread-local sender avoids process-global mutable state.
thread_local! {
    static KEY_EVENTS: RefCell<Option<Sender<KeyEvent>>> = const { RefCell::new(None) };
    static FOCUS_EVENTS: RefCell<Option<Sender<FocusEvent>>> = const { RefCell::new(None) };
}

/// Low-level keyboard hook procedure.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        let kb = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let msg = w_param.0 as u32;

        if matches!(msg, WM_KEYDOWN | WM_KEYUP | WM_SYSKEYDOWN | WM_SYSKEYUP) {
            let event = KeyEvent {
                vk: kb.vkCode,
                scan_code: kb.scanCode,
                pressed: matches!(msg, WM_KEYDOWN | WM_SYSKEYDOWN),
            };
            KEY_EVENTS.with(|tx| {
                if let Some(ref tx) = *tx.borrow() {
                    let _ = tx.try_send(event);
                }
            });
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Foreground-change WinEvent procedure.
unsafe extern "system" fn focus_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    _id_object: i32,
    _id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    if event == EVENT_SYSTEM_FOREGROUND {
        let payload = FocusEvent {
            window: WindowHandle(hwnd.0 as isize),
        };
        FOCUS_EVENTS.with(|tx| {
            if let Some(ref tx) = *tx.borrow() {
                let _ = tx.try_send(payload);
            }
        });
    }
}

/// Hook driver backed by the Windows hook APIs.
#[derive(Default)]
pub struct WindowsHookDriver;

impl HookDriver for WindowsHookDriver {
    fn install_keyboard_hook(&self, events: Sender<KeyEvent>) -> Result<(), HookError> {
        spawn_hook_thread("keyboard-hook", move || {
            KEY_EVENTS.with(|tx| *tx.borrow_mut() = Some(events));
            let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) };
            match hook {
                Ok(_) => {
                    info!("keyboard hook installed");
                    Ok(())
                }
                Err(e) => Err(HookError::InstallFailed(format!("keyboard hook: {e}"))),
            }
        })
    }

    fn install_focus_hook(&self, events: Sender<FocusEvent>) -> Result<(), HookError> {
        spawn_hook_thread("focus-hook", move || {
            FOCUS_EVENTS.with(|tx| *tx.borrow_mut() = Some(events));
            let hook = unsafe {
                SetWinEventHook(
                    EVENT_SYSTEM_FOREGROUND,
                    EVENT_SYSTEM_FOREGROUND,
                    None,
                    Some(focus_event_proc),
                    0,
                    0,
                    WINEVENT_OUTOFCONTEXT,
                )
            };
            if hook.is_invalid() {
                Err(HookError::InstallFailed("focus hook".into()))
            } else {
                info!("focus hook installed");
                Ok(())
            }
        })
    }
}

/// Spawn a thread that installs a hook and then pumps messages forever.
///
/// Installation happens on the new thread (hooks fire on the installing
/// thread's message loop); the result is reported back so registration can
/// fail fatally instead of losing events silently.
fn spawn_hook_thread(
    name: &str,
    install: impl FnOnce() -> Result<(), HookError> + Send + 'static,
) -> Result<(), HookError> {
    let (ready_tx, ready_rx) = bounded::<Result<(), HookError>>(1);

    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let installed = install();
            let failed = installed.is_err();
            let _ = ready_tx.send(installed);
            if failed {
                return;
            }

            // The hook fires from inside GetMessageW; we never receive
            // messages of our own, so there is nothing to dispatch.
            unsafe {
                let mut msg = MSG::default();
                while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {}
            }
        })
        .map_err(|e| HookError::WorkerSpawn(e.to_string()))?;

    ready_rx
        .recv()
        .map_err(|_| HookError::InstallFailed("hook thread exited before reporting".into()))?
}
