//! Screenshot capture source.
//!
//! Unlike the input sources this one is not driven directly by an OS hook:
//! a timing strategy decides when `capture_screenshot` fires. The fixed
//! interval strategy runs a plain sampling loop; the window-change strategy
//! registers itself as a focus observer (with debouncing and a short
//! post-change delay) and keeps a fixed-interval backup loop so long stays
//! on one window are still sampled. Both pause while the user is idle.
//!
//! Every individual capture is allowed to fail: no foreground window,
//! monitor lookup failure, grab failure, and encode failure are logged and
//! skipped, and the next scheduled capture proceeds normally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::hooks::{FocusEvent, FocusObserver, HookRegistry};
use crate::platform::{
    DesktopQuery, Frame, FrameGrabber, IdleQuery, PlatformDesktopQuery, PlatformFrameGrabber,
    PlatformIdleQuery,
};
use crate::sink::EventSink;
use crate::sources::serialize::SerializationStrategy;
use crate::sources::timing::{should_pause_for_idle, DebounceGate};
use crate::sources::{CaptureSource, SetupError};
use crate::stats::SharedSessionStats;

/// Screenshot intervals below this are clamped up.
pub const MIN_INTERVAL_SECS: u32 = 1;

/// Validated timing parameters for a screenshot source.
#[derive(Debug, Clone)]
pub struct ScreenshotConfig {
    pub interval: Duration,
    pub idle_pause: Duration,
    pub change_debounce: Duration,
    pub capture_delay: Duration,
}

/// When the screenshot source fires. A closed set: there is no plugin
/// surface here, only the two documented behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingStrategy {
    FixedInterval,
    WindowChange,
}

/// Shared capture state: everything a timing loop or focus callback needs
/// to take one screenshot.
struct ScreenshotWorker {
    config: ScreenshotConfig,
    serializer: SerializationStrategy,
    grabber: Arc<dyn FrameGrabber>,
    desktop: Arc<dyn DesktopQuery>,
    idle: Arc<dyn IdleQuery>,
    sink: Mutex<Option<Weak<EventSink>>>,
    running: AtomicBool,
    stats: SharedSessionStats,
}

impl ScreenshotWorker {
    fn is_idle(&self) -> bool {
        should_pause_for_idle(
            Duration::from_millis(self.idle.idle_millis()),
            self.config.idle_pause,
        )
    }

    /// Take one screenshot of the focused monitor and serialize it.
    ///
    /// Returns false when the capture was skipped; all skip paths are
    /// transient and the loop simply tries again next tick.
    fn capture_screenshot(&self) -> bool {
        let weak = self.sink.lock().unwrap().clone();
        let Some(weak) = weak else {
            return false;
        };
        // An expired sink means teardown is racing us; abandon quietly.
        let Some(sink) = weak.upgrade() else {
            debug!("sink is gone; abandoning screenshot");
            return false;
        };

        let Some(window) = self.desktop.foreground_window() else {
            warn!("no foreground window; skipping screenshot");
            self.stats.record_screenshot_skipped();
            return false;
        };
        let Some(bounds) = self.desktop.monitor_bounds(window) else {
            warn!("could not resolve monitor bounds for the focused window; skipping screenshot");
            self.stats.record_screenshot_skipped();
            return false;
        };

        let frame = match self.grabber.grab(bounds) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{e}; skipping screenshot");
                self.stats.record_screenshot_skipped();
                return false;
            }
        };

        let frame = bgr_to_rgb(frame);
        if let Err(e) = self.serializer.serialize(&sink, &frame) {
            warn!("{e}; skipping screenshot");
            self.stats.record_screenshot_skipped();
            return false;
        }

        self.stats.record_screenshot();
        true
    }
}

/// Swap a grabber's BGR rows into the RGB order the serializers expect.
fn bgr_to_rgb(mut frame: Frame) -> Frame {
    if frame.channels == 3 {
        for px in frame.pixels.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
    }
    frame
}

/// Sampling loop shared by the fixed-interval strategy and the
/// window-change strategy's backup timer. Sleeps on the shutdown channel so
/// teardown wakes it without waiting out the interval.
fn run_interval_loop(worker: Arc<ScreenshotWorker>, shutdown: Receiver<()>) {
    info!(
        interval_secs = worker.config.interval.as_secs(),
        "screenshot interval loop started"
    );
    while worker.running.load(Ordering::SeqCst) {
        if worker.is_idle() {
            debug!("user idle; skipping screenshot tick");
            worker.stats.record_screenshot_skipped();
        } else {
            worker.capture_screenshot();
        }

        match shutdown.recv_timeout(worker.config.interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            // Shutdown signal, or the source side went away.
            _ => break,
        }
    }
    debug!("screenshot interval loop exiting");
}

/// Focus observer for the window-change strategy: debounce, wait for the
/// new window to paint, then capture.
struct ChangeTriggeredCapture {
    worker: Arc<ScreenshotWorker>,
    gate: DebounceGate,
}

impl FocusObserver for ChangeTriggeredCapture {
    fn on_focus_change(&self, _event: &FocusEvent) {
        if !self.worker.running.load(Ordering::SeqCst) {
            return;
        }
        if !self.gate.try_trigger() {
            debug!("window change within debounce window; suppressed");
            return;
        }

        // Give the newly focused window a moment to finish rendering.
        thread::sleep(self.worker.config.capture_delay);

        if !self.worker.running.load(Ordering::SeqCst) {
            return;
        }
        if self.worker.is_idle() {
            return;
        }
        self.worker.capture_screenshot();
    }
}

/// Capture source for periodic screenshots.
pub struct ScreenshotSource {
    registry: Arc<HookRegistry>,
    worker: Arc<ScreenshotWorker>,
    timing: TimingStrategy,
    threads: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    focus_observer: Mutex<Option<Arc<dyn FocusObserver>>>,
    active: AtomicBool,
}

impl ScreenshotSource {
    /// Configuration entry point.
    pub fn builder(registry: Arc<HookRegistry>, stats: SharedSessionStats) -> ScreenshotSourceBuilder {
        ScreenshotSourceBuilder::new(registry, stats)
    }
}

impl CaptureSource for ScreenshotSource {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    fn initialize(&self, sink: Weak<EventSink>) -> Result<(), SetupError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(SetupError::AlreadyActive(self.name()));
        }
        *self.worker.sink.lock().unwrap() = Some(sink);
        self.worker.running.store(true, Ordering::SeqCst);

        let rollback = |this: &Self| {
            this.worker.running.store(false, Ordering::SeqCst);
            if let Some(observer) = this.focus_observer.lock().unwrap().take() {
                this.registry.unregister_focus_observer(&observer);
            }
            this.worker.sink.lock().unwrap().take();
            this.active.store(false, Ordering::SeqCst);
        };

        if self.timing == TimingStrategy::WindowChange {
            let observer: Arc<dyn FocusObserver> = Arc::new(ChangeTriggeredCapture {
                worker: self.worker.clone(),
                gate: DebounceGate::new(self.worker.config.change_debounce),
            });
            if let Err(e) = self.registry.register_focus_observer(observer.clone()) {
                rollback(self);
                return Err(e.into());
            }
            *self.focus_observer.lock().unwrap() = Some(observer);
        }

        // Both strategies run the sampling loop; for WindowChange it is the
        // backup that fires regardless of debounce state.
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let worker = self.worker.clone();
        let handle = thread::Builder::new()
            .name("screenshot-timer".to_string())
            .spawn(move || run_interval_loop(worker, shutdown_rx))
            .map_err(|e| {
                rollback(self);
                SetupError::Io(e.to_string())
            })?;

        *self.shutdown_tx.lock().unwrap() = Some(shutdown_tx);
        self.threads.lock().unwrap().push(handle);
        info!(strategy = ?self.timing, "screenshot source started");
        Ok(())
    }

    fn uninitialize(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.worker.running.store(false, Ordering::SeqCst);

        // Dropping the sender disconnects the sleep channel, waking the
        // loop mid-interval.
        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.try_send(());
            drop(tx);
        }
        if let Some(observer) = self.focus_observer.lock().unwrap().take() {
            self.registry.unregister_focus_observer(&observer);
        }
        for handle in self.threads.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
        self.worker.sink.lock().unwrap().take();
    }
}

impl Drop for ScreenshotSource {
    fn drop(&mut self) {
        self.uninitialize();
    }
}

/// Builder for [`ScreenshotSource`]: collects timing and serialization
/// options, validates them, and prepares the output directory.
pub struct ScreenshotSourceBuilder {
    registry: Arc<HookRegistry>,
    stats: SharedSessionStats,
    interval_secs: u32,
    idle_pause_secs: u32,
    change_debounce_secs: u32,
    capture_delay_secs: u32,
    timing: TimingStrategy,
    serialization: SerializationChoice,
    grabber: Option<Arc<dyn FrameGrabber>>,
    desktop: Option<Arc<dyn DesktopQuery>>,
    idle: Option<Arc<dyn IdleQuery>>,
}

enum SerializationChoice {
    FilePath(std::path::PathBuf),
    Base64,
}

impl ScreenshotSourceBuilder {
    pub fn new(registry: Arc<HookRegistry>, stats: SharedSessionStats) -> Self {
        Self {
            registry,
            stats,
            interval_secs: 5,
            idle_pause_secs: 60,
            change_debounce_secs: 5,
            capture_delay_secs: 2,
            timing: TimingStrategy::FixedInterval,
            serialization: SerializationChoice::FilePath(std::path::PathBuf::from(
                "./activity-screenshots",
            )),
            grabber: None,
            desktop: None,
            idle: None,
        }
    }

    pub fn interval_secs(mut self, secs: u32) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn idle_pause_secs(mut self, secs: u32) -> Self {
        self.idle_pause_secs = secs;
        self
    }

    pub fn change_debounce_secs(mut self, secs: u32) -> Self {
        self.change_debounce_secs = secs;
        self
    }

    pub fn capture_delay_secs(mut self, secs: u32) -> Self {
        self.capture_delay_secs = secs;
        self
    }

    pub fn timing(mut self, timing: TimingStrategy) -> Self {
        self.timing = timing;
        self
    }

    /// Save screenshots as PNG files under `dir` (created if absent).
    pub fn file_output(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.serialization = SerializationChoice::FilePath(dir.into());
        self
    }

    /// Embed screenshots inline as base64 instead of writing files.
    pub fn base64_output(mut self) -> Self {
        self.serialization = SerializationChoice::Base64;
        self
    }

    /// Override the platform frame grabber (used by tests).
    pub fn frame_grabber(mut self, grabber: Arc<dyn FrameGrabber>) -> Self {
        self.grabber = Some(grabber);
        self
    }

    /// Override the platform desktop query (used by tests).
    pub fn desktop_query(mut self, desktop: Arc<dyn DesktopQuery>) -> Self {
        self.desktop = Some(desktop);
        self
    }

    /// Override the platform idle query (used by tests).
    pub fn idle_query(mut self, idle: Arc<dyn IdleQuery>) -> Self {
        self.idle = Some(idle);
        self
    }

    /// Validate the configuration and build the source.
    pub fn build(self) -> Result<ScreenshotSource, SetupError> {
        let interval_secs = if self.interval_secs < MIN_INTERVAL_SECS {
            warn!(
                requested = self.interval_secs,
                clamped = MIN_INTERVAL_SECS,
                "screenshot interval below the minimum; clamping"
            );
            MIN_INTERVAL_SECS
        } else {
            self.interval_secs
        };

        let serializer = match self.serialization {
            SerializationChoice::FilePath(dir) => {
                // Missing output directory is a setup fault, not a capture
                // fault: fail now rather than on the first screenshot.
                std::fs::create_dir_all(&dir).map_err(|e| {
                    SetupError::Io(format!(
                        "could not create screenshot directory {}: {e}",
                        dir.display()
                    ))
                })?;
                SerializationStrategy::FilePath { output_dir: dir }
            }
            SerializationChoice::Base64 => SerializationStrategy::Base64,
        };

        let config = ScreenshotConfig {
            interval: Duration::from_secs(interval_secs as u64),
            idle_pause: Duration::from_secs(self.idle_pause_secs as u64),
            change_debounce: Duration::from_secs(self.change_debounce_secs as u64),
            capture_delay: Duration::from_secs(self.capture_delay_secs as u64),
        };

        Ok(ScreenshotSource {
            registry: self.registry,
            worker: Arc::new(ScreenshotWorker {
                config,
                serializer,
                grabber: self
                    .grabber
                    .unwrap_or_else(|| Arc::new(PlatformFrameGrabber::default())),
                desktop: self
                    .desktop
                    .unwrap_or_else(|| Arc::new(PlatformDesktopQuery::default())),
                idle: self
                    .idle
                    .unwrap_or_else(|| Arc::new(PlatformIdleQuery::default())),
                sink: Mutex::new(None),
                running: AtomicBool::new(false),
                stats: self.stats,
            }),
            timing: self.timing,
            threads: Mutex::new(Vec::new()),
            shutdown_tx: Mutex::new(None),
            focus_observer: Mutex::new(None),
            active: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::WindowHandle;
    use crate::platform::{Bounds, CaptureError};
    use crate::stats::SessionStats;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicU64;

    struct FixedDesktop;

    impl DesktopQuery for FixedDesktop {
        fn foreground_window(&self) -> Option<WindowHandle> {
            Some(WindowHandle(1))
        }

        fn window_title(&self, _window: WindowHandle) -> Option<String> {
            Some("Fixed".into())
        }

        fn monitor_bounds(&self, _window: WindowHandle) -> Option<Bounds> {
            Some(Bounds {
                x: 0,
                y: 0,
                width: 2,
                height: 1,
            })
        }
    }

    struct HeadlessDesktop;

    impl DesktopQuery for HeadlessDesktop {
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

    struct BgrGrabber;

    impl FrameGrabber for BgrGrabber {
        fn grab(&self, _bounds: Bounds) -> Result<Frame, CaptureError> {
            // Two BGR pixels: blue then green.
            Ok(Frame {
                pixels: vec![255, 0, 0, 0, 255, 0],
                width: 2,
                height: 1,
                channels: 3,
            })
        }
    }

    struct StaticIdle(u64);

    impl IdleQuery for StaticIdle {
        fn idle_millis(&self) -> u64 {
            self.0
        }
    }

    fn temp_sink(name: &str) -> (Arc<EventSink>, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "activity-recorder-shot-{}-{name}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let sink =
            EventSink::create(&path, 1_000_000, SessionStats::shared()).unwrap();
        (sink, path)
    }

    fn worker(
        desktop: Arc<dyn DesktopQuery>,
        idle_millis: u64,
        sink: Option<&Arc<EventSink>>,
    ) -> Arc<ScreenshotWorker> {
        Arc::new(ScreenshotWorker {
            config: ScreenshotConfig {
                interval: Duration::from_secs(5),
                idle_pause: Duration::from_secs(60),
                change_debounce: Duration::from_secs(5),
                capture_delay: Duration::from_millis(0),
            },
            serializer: SerializationStrategy::Base64,
            grabber: Arc::new(BgrGrabber),
            desktop,
            idle: Arc::new(StaticIdle(idle_millis)),
            sink: Mutex::new(sink.map(Arc::downgrade)),
            running: AtomicBool::new(true),
            stats: SessionStats::shared(),
        })
    }

    #[test]
    fn bgr_frames_are_converted_to_rgb() {
        let frame = bgr_to_rgb(Frame {
            pixels: vec![255, 0, 0, 0, 255, 0],
            width: 2,
            height: 1,
            channels: 3,
        });
        assert_eq!(frame.pixels, vec![0, 0, 255, 0, 255, 0]);
    }

    #[test]
    fn capture_emits_screenshot_token() {
        let (sink, path) = temp_sink("capture");
        let worker = worker(Arc::new(FixedDesktop), 0, Some(&sink));

        assert!(worker.capture_screenshot());
        assert!(sink.buffered().starts_with("[SCREENSHOT_BASE64]"));
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn capture_with_expired_sink_is_abandoned_without_error() {
        let (sink, path) = temp_sink("expired");
        let worker = worker(Arc::new(FixedDesktop), 0, Some(&sink));
        drop(sink);

        assert!(!worker.capture_screenshot());
        assert_eq!(worker.stats.snapshot().screenshots_skipped, 0);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn capture_without_foreground_window_is_skipped() {
        let (sink, path) = temp_sink("headless");
        let worker = worker(Arc::new(HeadlessDesktop), 0, Some(&sink));

        assert!(!worker.capture_screenshot());
        assert_eq!(worker.stats.snapshot().screenshots_skipped, 1);
        assert_eq!(sink.buffered(), "");
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn idle_worker_reports_idle() {
        let (sink, path) = temp_sink("idle");
        let idle_worker = worker(Arc::new(FixedDesktop), 60_000, Some(&sink));
        let busy_worker = worker(Arc::new(FixedDesktop), 500, Some(&sink));

        assert!(idle_worker.is_idle());
        assert!(!busy_worker.is_idle());
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn focus_trigger_captures_and_respects_shutdown() {
        let (sink, path) = temp_sink("trigger");
        let worker = worker(Arc::new(FixedDesktop), 0, Some(&sink));
        let trigger = ChangeTriggeredCapture {
            worker: worker.clone(),
            gate: DebounceGate::new(Duration::from_secs(0)),
        };

        trigger.on_focus_change(&FocusEvent {
            window: WindowHandle(1),
        });
        assert_eq!(worker.stats.snapshot().screenshots_captured, 1);

        worker.running.store(false, Ordering::SeqCst);
        trigger.on_focus_change(&FocusEvent {
            window: WindowHandle(1),
        });
        assert_eq!(worker.stats.snapshot().screenshots_captured, 1);
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn interval_loop_exits_promptly_on_shutdown() {
        struct CountingGrabber(AtomicU64);
        impl FrameGrabber for CountingGrabber {
            fn grab(&self, _bounds: Bounds) -> Result<Frame, CaptureError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(Frame {
                    pixels: vec![0, 0, 0],
                    width: 1,
                    height: 1,
                    channels: 3,
                })
            }
        }

        let (sink, path) = temp_sink("loop-shutdown");
        let worker = Arc::new(ScreenshotWorker {
            config: ScreenshotConfig {
                interval: Duration::from_secs(30),
                idle_pause: Duration::from_secs(60),
                change_debounce: Duration::from_secs(5),
                capture_delay: Duration::from_secs(0),
            },
            serializer: SerializationStrategy::Base64,
            grabber: Arc::new(CountingGrabber(AtomicU64::new(0))),
            desktop: Arc::new(FixedDesktop),
            idle: Arc::new(StaticIdle(0)),
            sink: Mutex::new(Some(Arc::downgrade(&sink))),
            running: AtomicBool::new(true),
            stats: SessionStats::shared(),
        });

        let (tx, rx) = bounded::<()>(1);
        let loop_worker = worker.clone();
        let handle = thread::spawn(move || run_interval_loop(loop_worker, rx));

        // One immediate capture, then the loop parks on its 30s sleep. The
        // shutdown signal must wake and end it well before that.
        std::thread::sleep(Duration::from_millis(100));
        worker.running.store(false, Ordering::SeqCst);
        tx.try_send(()).unwrap();
        let start = std::time::Instant::now();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(worker.stats.snapshot().screenshots_captured, 1);
        drop(sink);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn builder_clamps_zero_interval() {
        let registry = Arc::new(HookRegistry::new());
        let source = ScreenshotSource::builder(registry, SessionStats::shared())
            .interval_secs(0)
            .base64_output()
            .build()
            .unwrap();
        assert_eq!(
            source.worker.config.interval,
            Duration::from_secs(MIN_INTERVAL_SECS as u64)
        );
    }

    #[test]
    fn source_lifecycle_starts_and_stops_the_loop() {
        let (sink, path) = temp_sink("lifecycle");
        let registry = Arc::new(HookRegistry::new());
        let source = ScreenshotSource::builder(registry, SessionStats::shared())
            .interval_secs(60)
            .base64_output()
            .frame_grabber(Arc::new(BgrGrabber))
            .desktop_query(Arc::new(FixedDesktop))
            .idle_query(Arc::new(StaticIdle(0)))
            .build()
            .unwrap();

        source.initialize(Arc::downgrade(&sink)).unwrap();
        assert!(matches!(
            source.initialize(Arc::downgrade(&sink)),
            Err(SetupError::AlreadyActive(_))
        ));

        source.uninitialize();
        // A second uninitialize is a no-op.
        source.uninitialize();
        drop(sink);
        let _ = std::fs::remove_file(path);
    }
}
