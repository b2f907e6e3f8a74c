//! Notifier bridge between the upload listener and the window
//!
//! The listener's worker threads append status lines; the egui update loop
//! drains them on a fixed cadence. This queue is the only state the two
//! sides share.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A status line produced by the listener for one upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine(String);

impl LogLine {
    /// Prefix of a line describing a saved batch
    pub const RECEIVED_MARKER: &'static str = "[RECEIVED]";
    /// Prefix of a line describing a failed request
    pub const ERROR_MARKER: &'static str = "[ERROR]";

    /// Summary of a batch that was written to disk
    pub fn received(kind: &str, count: usize, saved: &Path) -> Self {
        Self(format!(
            "{} type={} count={} saved={}",
            Self::RECEIVED_MARKER,
            kind,
            count,
            saved.display()
        ))
    }

    /// Summary of a request that failed
    pub fn error(message: impl fmt::Display) -> Self {
        Self(format!("{} {}", Self::ERROR_MARKER, message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_error(&self) -> bool {
        self.0.starts_with(Self::ERROR_MARKER)
    }

    pub fn is_received(&self) -> bool {
        self.0.starts_with(Self::RECEIVED_MARKER)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, thread-safe handoff of [`LogLine`]s.
///
/// Clones share the same queue. Producers call [`enqueue`](Self::enqueue)
/// from any thread; the single consumer calls [`drain_all`](Self::drain_all).
#[derive(Debug, Clone, Default)]
pub struct NotifierBridge {
    queue: Arc<Mutex<VecDeque<LogLine>>>,
}

impl NotifierBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line to the tail of the queue
    pub fn enqueue(&self, line: LogLine) {
        self.lock().push_back(line);
    }

    /// Remove and return everything queued, oldest first
    pub fn drain_all(&self) -> Vec<LogLine> {
        let drained = std::mem::take(&mut *self.lock());
        drained.into()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A producer that panicked mid-push cannot leave the deque half-written,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogLine>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
