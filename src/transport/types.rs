//! Shared transport types

use parking_lot::Mutex;
use std::sync::Arc;

/// Append-only log of non-fatal transport faults.
///
/// Cloning shares the same underlying log, so a dispatcher and its owner can
/// both observe what went wrong without the fault ever being raised.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fault description
    pub fn record(&self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::warn!(error = %entry, "transport fault");
        self.entries.lock().push(entry);
    }

    /// Snapshot of all recorded entries, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<String> {
        self.entries.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_shared_between_clones() {
        let log = ErrorLog::new();
        let shared = log.clone();

        log.record("first");
        shared.record("second");

        assert_eq!(log.len(), 2);
        assert_eq!(shared.entries(), vec!["first", "second"]);
        assert_eq!(log.last().as_deref(), Some("second"));
    }

    #[test]
    fn test_error_log_empty() {
        let log = ErrorLog::default();
        assert!(log.is_empty());
        assert!(log.last().is_none());
    }
}
