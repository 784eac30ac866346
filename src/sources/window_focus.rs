//! Window-focus capture source.
//!
//! Registers for the foreground-change category and logs a structured
//! `[CHANGE_WINDOW]` token for every resolved window title. Title
//! resolution failures and the transient "Task Switching" pseudo-window
//! (shown during alt-tab animations) are suppressed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::Local;
use tracing::debug;

use crate::hooks::{FocusEvent, FocusObserver, HookRegistry};
use crate::platform::DesktopQuery;
use crate::sink::EventSink;
use crate::sources::{CaptureSource, SetupError};
use crate::stats::SharedSessionStats;
use crate::timefmt;

/// Pseudo-window the shell briefly focuses while the user cycles windows.
const TASK_SWITCHING_TITLE: &str = "Task Switching";

struct FocusLogObserver {
    desktop: Arc<dyn DesktopQuery>,
    sink: Mutex<Option<Weak<EventSink>>>,
    stats: SharedSessionStats,
}

impl FocusLogObserver {
    fn sink(&self) -> Option<Arc<EventSink>> {
        self.sink.lock().unwrap().as_ref()?.upgrade()
    }
}

impl FocusObserver for FocusLogObserver {
    fn on_focus_change(&self, event: &FocusEvent) {
        let Some(sink) = self.sink() else {
            return;
        };

        let Some(title) = self.desktop.window_title(event.window) else {
            debug!("focused window has no resolvable title; suppressed");
            return;
        };
        if title == TASK_SWITCHING_TITLE {
            return;
        }

        self.stats.record_focus_event();
        let stamp = timefmt::llm_timestamp(Local::now());
        sink.write(&format!(
            "\n[CHANGE_WINDOW]\"{title}\" TIMESTAMP: {stamp}[/CHANGE_WINDOW]\n"
        ));
    }
}

/// Capture source for foreground-window changes.
pub struct WindowFocusSource {
    registry: Arc<HookRegistry>,
    observer: Arc<FocusLogObserver>,
    active: AtomicBool,
}

impl WindowFocusSource {
    pub fn new(
        registry: Arc<HookRegistry>,
        desktop: Arc<dyn DesktopQuery>,
        stats: SharedSessionStats,
    ) -> Self {
        Self {
            registry,
            observer: Arc::new(FocusLogObserver {
                desktop,
                sink: Mutex::new(None),
                stats,
            }),
            active: AtomicBool::new(false),
        }
    }
}

impl CaptureSource for WindowFocusSource {
    fn name(&self) -> &'static str {
        "window-focus"
    }

    fn initialize(&self, sink: Weak<EventSink>) -> Result<(), SetupError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(SetupError::AlreadyActive(self.name()));
        }
        *self.observer.sink.lock().unwrap() = Some(sink);

        let observer: Arc<dyn FocusObserver> = self.observer.clone();
        if let Err(e) = self.registry.register_focus_observer(observer) {
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
        let observer: Arc<dyn FocusObserver> = self.observer.clone();
        self.registry.unregister_focus_observer(&observer);
        self.observer.sink.lock().unwrap().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::WindowHandle;
    use crate::platform::Bounds;
    use crate::stats::SessionStats;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct TitleTable {
        titles: HashMap<isize, String>,
    }

    impl DesktopQuery for TitleTable {
        fn foreground_window(&self) -> Option<WindowHandle> {
            None
        }

        fn window_title(&self, window: WindowHandle) -> Option<String> {
            self.titles.get(&window.0).cloned()
        }

        fn monitor_bounds(&self, _window: WindowHandle) -> Option<Bounds> {
            None
        }
    }

    fn temp_sink(name: &str) -> (Arc<EventSink>, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "activity-recorder-focus-{}-{name}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let sink =
            EventSink::create(&path, 1_000_000, SessionStats::shared()).unwrap();
        (sink, path)
    }

    fn observer(sink: &Arc<EventSink>, titles: &[(isize, &str)]) -> FocusLogObserver {
        FocusLogObserver {
            desktop: Arc::new(TitleTable {
                titles: titles
                    .iter()
                    .map(|(h, t)| (*h, t.to_string()))
                    .collect(),
            }),
            sink: Mutex::new(Some(Arc::downgrade(sink))),
            stats: SessionStats::shared(),
        }
    }

    #[test]
    fn emits_structured_change_window_token() {
        let (sink, path) = temp_sink("token");
        let obs = observer(&sink, &[(7, "Text Editor - notes.md")]);

        obs.on_focus_change(&FocusEvent {
            window: WindowHandle(7),
        });

        let logged = sink.buffered();
        assert!(logged.starts_with("\n[CHANGE_WINDOW]\"Text Editor - notes.md\" TIMESTAMP: "));
        assert!(logged.ends_with("[/CHANGE_WINDOW]\n"));
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn suppresses_unresolvable_titles() {
        let (sink, path) = temp_sink("unresolved");
        let obs = observer(&sink, &[]);

        obs.on_focus_change(&FocusEvent {
            window: WindowHandle(99),
        });

        assert_eq!(sink.buffered(), "");
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn suppresses_task_switching_pseudo_window() {
        let (sink, path) = temp_sink("task-switching");
        let obs = observer(&sink, &[(3, "Task Switching")]);

        obs.on_focus_change(&FocusEvent {
            window: WindowHandle(3),
        });

        assert_eq!(sink.buffered(), "");
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn expired_sink_is_a_quiet_no_op() {
        let (sink, path) = temp_sink("expired");
        let obs = observer(&sink, &[(1, "Anything")]);
        drop(sink);

        obs.on_focus_change(&FocusEvent {
            window: WindowHandle(1),
        });
        let _ = std::fs::remove_file(path);
    }
}
