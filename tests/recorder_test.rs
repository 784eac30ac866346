//! End-to-end tests for the capture pipeline: a mock hook driver feeds raw
//! events into the registry, the dispatch loop fans them out to the capture
//! sources, and the formatted tokens land in the sink's log file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use activity_recorder::platform::{Bounds, DesktopQuery, KeyTranslator};
use activity_recorder::{
    EventSink, FocusEvent, HookDriver, HookError, HookRegistry, KeyEvent, KeystrokeSource,
    SessionStats, WindowFocusSource, WindowHandle,
};

/// Hook driver that hands the raw-event senders to the test instead of
/// installing OS hooks.
#[derive(Default)]
struct ScriptedDriver {
    keyboard_installs: AtomicUsize,
    focus_installs: AtomicUsize,
    keyboard_tx: Mutex<Option<Sender<KeyEvent>>>,
    focus_tx: Mutex<Option<Sender<FocusEvent>>>,
}

impl ScriptedDriver {
    fn keyboard(&self) -> Sender<KeyEvent> {
        self.keyboard_tx.lock().unwrap().clone().expect("keyboard hook installed")
    }

    fn focus(&self) -> Sender<FocusEvent> {
        self.focus_tx.lock().unwrap().clone().expect("focus hook installed")
    }
}

impl HookDriver for ScriptedDriver {
    fn install_keyboard_hook(&self, events: Sender<KeyEvent>) -> Result<(), HookError> {
        self.keyboard_installs.fetch_add(1, Ordering::SeqCst);
        *self.keyboard_tx.lock().unwrap() = Some(events);
        Ok(())
    }

    fn install_focus_hook(&self, events: Sender<FocusEvent>) -> Result<(), HookError> {
        self.focus_installs.fetch_add(1, Ordering::SeqCst);
        *self.focus_tx.lock().unwrap() = Some(events);
        Ok(())
    }
}

struct AsciiTranslator;

impl KeyTranslator for AsciiTranslator {
    fn translate(&self, vk: u32, _scan_code: u32) -> Option<String> {
        match vk {
            0x30..=0x39 => Some(((vk as u8) as char).to_string()),
            0x41..=0x5A => Some(((vk as u8) as char).to_ascii_lowercase().to_string()),
            _ => None,
        }
    }
}

struct SingleWindowDesktop;

impl DesktopQuery for SingleWindowDesktop {
    fn foreground_window(&self) -> Option<WindowHandle> {
        Some(WindowHandle(42))
    }

    fn window_title(&self, window: WindowHandle) -> Option<String> {
        match window.0 {
            42 => Some("Terminal".to_string()),
            43 => Some("Task Switching".to_string()),
            _ => None,
        }
    }

    fn monitor_bounds(&self, _window: WindowHandle) -> Option<Bounds> {
        None
    }
}

fn temp_log(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "activity-recorder-e2e-{}-{name}.log",
        std::process::id()
    ))
}

fn key(vk: u32, pressed: bool) -> KeyEvent {
    KeyEvent {
        vk,
        scan_code: 0,
        pressed,
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for pipeline");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn keystrokes_flow_from_hook_to_log_in_order() {
    let log = temp_log("keystrokes");
    let _ = std::fs::remove_file(&log);

    let driver = Arc::new(ScriptedDriver::default());
    let registry = Arc::new(HookRegistry::with_driver(Box::new(driver.clone())));
    let stats = SessionStats::shared();
    let sink = EventSink::create(&log, 1_000_000, stats.clone()).unwrap();

    let source = Arc::new(KeystrokeSource::new(
        registry,
        Arc::new(AsciiTranslator),
        stats.clone(),
    ));
    sink.add_source(source).unwrap();

    let tx = driver.keyboard();
    for event in [
        key(0x48, true),  // h
        key(0x48, false),
        key(0x49, true),  // i
        key(0x49, false),
        key(0x20, true),  // [SPACE]
        key(0x0D, true),  // [ENTER]
    ] {
        tx.send(event).unwrap();
    }

    wait_until(|| stats.snapshot().key_events == 6);
    sink.shutdown();

    assert_eq!(std::fs::read_to_string(&log).unwrap(), "hi[SPACE][ENTER]");
    let _ = std::fs::remove_file(&log);
}

#[test]
fn two_keyboard_sources_share_one_subscription() {
    let log = temp_log("shared-subscription");
    let _ = std::fs::remove_file(&log);

    let driver = Arc::new(ScriptedDriver::default());
    let registry = Arc::new(HookRegistry::with_driver(Box::new(driver.clone())));
    let stats = SessionStats::shared();
    let sink = EventSink::create(&log, 1_000_000, stats.clone()).unwrap();

    let first = Arc::new(KeystrokeSource::new(
        registry.clone(),
        Arc::new(AsciiTranslator),
        stats.clone(),
    ));
    let second = Arc::new(KeystrokeSource::new(
        registry,
        Arc::new(AsciiTranslator),
        stats,
    ));
    sink.add_source(first).unwrap();
    sink.add_source(second).unwrap();

    assert_eq!(driver.keyboard_installs.load(Ordering::SeqCst), 1);
    sink.shutdown();
    let _ = std::fs::remove_file(&log);
}

#[test]
fn focus_changes_are_logged_and_pseudo_windows_suppressed() {
    let log = temp_log("focus");
    let _ = std::fs::remove_file(&log);

    let driver = Arc::new(ScriptedDriver::default());
    let registry = Arc::new(HookRegistry::with_driver(Box::new(driver.clone())));
    let stats = SessionStats::shared();
    let sink = EventSink::create(&log, 1_000_000, stats.clone()).unwrap();

    let source = Arc::new(WindowFocusSource::new(
        registry,
        Arc::new(SingleWindowDesktop),
        stats.clone(),
    ));
    sink.add_source(source).unwrap();

    let tx = driver.focus();
    // Alt-tab animation window, an unresolvable handle, then a real window.
    tx.send(FocusEvent {
        window: WindowHandle(43),
    })
    .unwrap();
    tx.send(FocusEvent {
        window: WindowHandle(999),
    })
    .unwrap();
    tx.send(FocusEvent {
        window: WindowHandle(42),
    })
    .unwrap();

    wait_until(|| stats.snapshot().focus_events == 1);
    sink.shutdown();

    let logged = std::fs::read_to_string(&log).unwrap();
    assert!(logged.contains("[CHANGE_WINDOW]\"Terminal\" TIMESTAMP: "));
    assert!(logged.contains("[/CHANGE_WINDOW]"));
    assert!(!logged.contains("Task Switching"));
    let _ = std::fs::remove_file(&log);
}

#[test]
fn no_tokens_are_emitted_after_shutdown() {
    let log = temp_log("post-shutdown");
    let _ = std::fs::remove_file(&log);

    let driver = Arc::new(ScriptedDriver::default());
    let registry = Arc::new(HookRegistry::with_driver(Box::new(driver.clone())));
    let stats = SessionStats::shared();
    let sink = EventSink::create(&log, 1_000_000, stats.clone()).unwrap();

    let source = Arc::new(KeystrokeSource::new(
        registry,
        Arc::new(AsciiTranslator),
        stats.clone(),
    ));
    sink.add_source(source).unwrap();

    let tx = driver.keyboard();
    tx.send(key(0x41, true)).unwrap(); // a
    wait_until(|| stats.snapshot().key_events == 1);

    sink.shutdown();
    let after_shutdown = std::fs::read_to_string(&log).unwrap();

    // The hook is still installed (subscriptions are process-lifetime), but
    // the unregistered source must not emit anything further.
    tx.send(key(0x42, true)).unwrap(); // b
    std::thread::sleep(Duration::from_millis(100));
    sink.flush();

    assert_eq!(std::fs::read_to_string(&log).unwrap(), after_shutdown);
    assert_eq!(after_shutdown, "a");
    let _ = std::fs::remove_file(&log);
}

#[test]
fn mixed_sources_interleave_into_one_chronological_stream() {
    let log = temp_log("mixed");
    let _ = std::fs::remove_file(&log);

    let driver = Arc::new(ScriptedDriver::default());
    let registry = Arc::new(HookRegistry::with_driver(Box::new(driver.clone())));
    let stats = SessionStats::shared();
    let sink = EventSink::create(&log, 1_000_000, stats.clone()).unwrap();

    sink.add_source(Arc::new(KeystrokeSource::new(
        registry.clone(),
        Arc::new(AsciiTranslator),
        stats.clone(),
    )))
    .unwrap();
    sink.add_source(Arc::new(WindowFocusSource::new(
        registry,
        Arc::new(SingleWindowDesktop),
        stats.clone(),
    )))
    .unwrap();

    let keys = driver.keyboard();
    let focus = driver.focus();

    keys.send(key(0x48, true)).unwrap(); // h
    wait_until(|| stats.snapshot().key_events == 1);
    focus
        .send(FocusEvent {
            window: WindowHandle(42),
        })
        .unwrap();
    wait_until(|| stats.snapshot().focus_events == 1);
    keys.send(key(0x49, true)).unwrap(); // i
    wait_until(|| stats.snapshot().key_events == 2);

    sink.shutdown();

    let logged = std::fs::read_to_string(&log).unwrap();
    let h = logged.find('h').unwrap();
    let change = logged.find("[CHANGE_WINDOW]").unwrap();
    let i = logged.rfind('i').unwrap();
    assert!(h < change && change < i);
    let _ = std::fs::remove_file(&log);
}
