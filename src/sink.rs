//! Event sink: the single ordered destination for all formatted activity
//! text.
//!
//! The sink owns the output file and an in-memory buffer of formatted
//! characters. Writes append to the buffer; once the buffer reaches the
//! configured threshold it is flushed to the file and cleared, so memory
//! stays bounded. Buffer and file live behind one mutex because multiple
//! capture sources can emit concurrently.
//!
//! The sink does not own its sources' lifecycles beyond initialization: it
//! hands each added source a `Weak` reference to itself and remembers the
//! source so shutdown can uninitialize all of them before the file goes
//! away. Sources must tolerate the sink disappearing first.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, info};

use crate::sources::{CaptureSource, SetupError};
use crate::stats::SharedSessionStats;

/// Flush the recording buffer to the output file once it reaches this many
/// characters.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1500;

/// Errors opening the sink's output file. Fatal at construction: a recorder
/// that silently fails to write is worse than one that crashes loudly.
#[derive(Debug)]
pub enum SinkError {
    Open(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Open(e) => write!(f, "failed to open activity log: {e}"),
        }
    }
}

impl std::error::Error for SinkError {}

struct SinkInner {
    buffer: String,
    file: File,
}

/// Ordered, buffered writer for the activity log.
pub struct EventSink {
    inner: Mutex<SinkInner>,
    flush_threshold: usize,
    sources: Mutex<Vec<Arc<dyn CaptureSource>>>,
    stats: SharedSessionStats,
    // Handed to sources as their non-owning sink reference.
    self_weak: Weak<EventSink>,
}

impl EventSink {
    /// Open (or create) the output file in append mode.
    pub fn create(
        path: &Path,
        flush_threshold: usize,
        stats: SharedSessionStats,
    ) -> Result<Arc<Self>, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::Open(format!("{}: {e}", path.display())))?;

        info!(
            path = %path.display(),
            flush_threshold, "event sink opened"
        );

        Ok(Arc::new_cyclic(|self_weak| Self {
            inner: Mutex::new(SinkInner {
                buffer: String::new(),
                file,
            }),
            flush_threshold: flush_threshold.max(1),
            sources: Mutex::new(Vec::new()),
            stats,
            self_weak: self_weak.clone(),
        }))
    }

    /// Append formatted text to the recording buffer, flushing when the
    /// threshold is reached. The buffer is always below the threshold when
    /// this returns.
    pub fn write(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.buffer.push_str(text);
        if inner.buffer.len() >= self.flush_threshold {
            Self::flush_locked(&mut inner, &self.stats);
        }
    }

    /// Flush any buffered text to the file. A no-op on an empty buffer.
    pub fn flush(&self) {
        let mut inner = self.inner.lock().unwrap();
        Self::flush_locked(&mut inner, &self.stats);
    }

    /// Number of characters currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.inner.lock().unwrap().buffer.len()
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> String {
        self.inner.lock().unwrap().buffer.clone()
    }

    fn flush_locked(inner: &mut SinkInner, stats: &SharedSessionStats) {
        if inner.buffer.is_empty() {
            return;
        }
        debug!(len = inner.buffer.len(), "flushing recording buffer");

        let bytes = std::mem::take(&mut inner.buffer);
        let mut write_result = inner.file.write_all(bytes.as_bytes());
        if write_result.is_ok() {
            write_result = inner.file.flush();
        }
        if let Err(e) = write_result {
            // Dropping the buffered text keeps memory bounded; the loss is
            // loud in the logs rather than silent.
            error!("failed to flush activity log: {e}");
        } else {
            stats.record_flush(bytes.len() as u64);
        }
    }

    /// Add a capture source: initializes it with a non-owning reference to
    /// this sink and tracks it for teardown.
    pub fn add_source(&self, source: Arc<dyn CaptureSource>) -> Result<(), SetupError> {
        source.initialize(self.self_weak.clone())?;
        info!(source = source.name(), "capture source initialized");
        self.sources.lock().unwrap().push(source);
        Ok(())
    }

    /// Uninitialize every added source, then flush whatever is buffered.
    ///
    /// Sources are torn down first so nothing emits into a closed stream;
    /// the file itself closes when the sink is dropped.
    pub fn shutdown(&self) {
        let sources: Vec<_> = self.sources.lock().unwrap().drain(..).collect();
        for source in sources {
            source.uninitialize();
            info!(source = source.name(), "capture source uninitialized");
        }
        self.flush();
    }
}

impl Drop for EventSink {
    fn drop(&mut self) {
        // Shutdown may already have run; both calls are idempotent.
        let sources: Vec<_> = self.sources.lock().unwrap().drain(..).collect();
        for source in sources {
            source.uninitialize();
        }
        let mut inner = self.inner.lock().unwrap();
        Self::flush_locked(&mut inner, &self.stats);
    }
}
