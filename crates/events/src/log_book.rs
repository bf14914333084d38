use crate::error::EventsError;
use crate::messages::{LogLevel, LogMessage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// How many entries the operator log keeps by default.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// A bounded, newest-first operator log.
///
/// Cloning a `LogBook` yields another handle to the same underlying list, so the
/// background engine can append while the control layer reads. Once the book is
/// full, every new entry evicts the oldest one.
#[derive(Debug, Clone)]
pub struct LogBook {
    inner: Arc<Mutex<VecDeque<LogMessage>>>,
    capacity: usize,
}

impl Default for LogBook {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(DEFAULT_LOG_CAPACITY))),
            capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl LogBook {
    pub fn new(capacity: usize) -> Result<Self, EventsError> {
        if capacity == 0 {
            return Err(EventsError::InvalidCapacity(capacity));
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogLevel::Error, message);
    }

    /// Appends a timestamped entry and mirrors it into `tracing`.
    pub fn record(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(target: "trailguard::oplog", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "trailguard::oplog", "{}", message),
            LogLevel::Error => tracing::error!(target: "trailguard::oplog", "{}", message),
        }

        // Stamped under the lock so list order and timestamp order agree.
        let mut entries = self.lock();
        entries.push_front(LogMessage::new(level, message));
        entries.truncate(self.capacity);
    }

    /// A copy of the retained entries, newest first.
    pub fn entries(&self) -> Vec<LogMessage> {
        self.lock().iter().cloned().collect()
    }

    /// The retained entries rendered as display lines, newest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the deque half-written, so
    // a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogMessage>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_hundred_entries() {
        let book = LogBook::default();
        for i in 0..150 {
            book.info(format!("entry {i}"));
        }

        let entries = book.entries();
        assert_eq!(entries.len(), 100);
        assert_eq!(entries.first().unwrap().message, "entry 149");
        assert_eq!(entries.last().unwrap().message, "entry 50");
        assert!(!entries.iter().any(|e| e.message == "entry 49"));

        // Strictly newest first.
        for (pos, entry) in entries.iter().enumerate() {
            assert_eq!(entry.message, format!("entry {}", 149 - pos));
        }
    }

    #[test]
    fn clones_share_the_same_list() {
        let book = LogBook::new(10).unwrap();
        let writer = book.clone();
        writer.warn("from the worker");

        assert_eq!(book.len(), 1);
        assert_eq!(book.entries()[0].level, LogLevel::Warn);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(LogBook::new(0), Err(EventsError::InvalidCapacity(0))));
    }

    #[test]
    fn concurrent_appends_stay_bounded() {
        let book = LogBook::new(50).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let book = book.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        book.error(format!("thread {t} entry {i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(book.len(), 50);
        let entries = book.entries();
        for pair in entries.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn lines_render_newest_first() {
        let book = LogBook::default();
        book.info("first");
        book.info("second");

        let lines = book.lines();
        assert!(lines[0].ends_with("second"));
        assert!(lines[1].ends_with("first"));

        book.clear();
        assert!(book.is_empty());
    }
}
