//! Append-only grouping of metric batches by message id

use crate::aggregation::types::MetricBatch;
use indexmap::IndexMap;
use parking_lot::RwLock;

/// Maps a message id to every batch received for it.
///
/// Ids keep the order they were first seen in, batches keep arrival order.
/// Entries are never removed or rewritten; retention belongs to the caller.
#[derive(Debug, Default)]
pub struct AggregationStore {
    groups: RwLock<IndexMap<String, Vec<MetricBatch>>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure an (initially empty) group exists for `message_id`
    pub fn add_message(&self, message_id: &str) {
        let mut groups = self.groups.write();
        if !groups.contains_key(message_id) {
            groups.insert(message_id.to_string(), Vec::new());
        }
    }

    /// Append a batch to the group for `message_id`, creating the group if needed
    pub fn add_metric(&self, message_id: &str, batch: MetricBatch) {
        let mut groups = self.groups.write();
        match groups.get_mut(message_id) {
            Some(batches) => batches.push(batch),
            None => {
                groups.insert(message_id.to_string(), vec![batch]);
            }
        }
    }

    /// Message ids in order of first appearance
    pub fn message_ids(&self) -> Vec<String> {
        self.groups.read().keys().cloned().collect()
    }

    /// Batches recorded for one message id
    pub fn batches(&self, message_id: &str) -> Option<Vec<MetricBatch>> {
        self.groups.read().get(message_id).cloned()
    }

    /// Snapshot of the full mapping
    pub fn all_groups(&self) -> IndexMap<String, Vec<MetricBatch>> {
        self.groups.read().clone()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.groups.read().contains_key(message_id)
    }

    /// Number of distinct message ids
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::types::MetricSample;
    use std::sync::Arc;

    fn batch(name: &str, value: f64) -> MetricBatch {
        MetricBatch::new().with_series(name, vec![MetricSample::new(100, value)])
    }

    #[test]
    fn test_add_metric_accumulates() {
        let store = AggregationStore::new();

        store.add_metric("m1", batch("cpu", 0.5));
        store.add_metric("m1", batch("mem", 42.0));

        let batches = store.batches("m1").unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], batch("cpu", 0.5));
        assert_eq!(batches[1], batch("mem", 42.0));
    }

    #[test]
    fn test_message_ids_in_first_seen_order() {
        let store = AggregationStore::new();

        store.add_metric("b", batch("cpu", 1.0));
        store.add_metric("a", batch("cpu", 2.0));
        store.add_metric("b", batch("cpu", 3.0));

        assert_eq!(store.message_ids(), vec!["b", "a"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_add_message_does_not_reset() {
        let store = AggregationStore::new();

        store.add_message("m1");
        assert_eq!(store.batches("m1"), Some(Vec::new()));

        store.add_metric("m1", batch("cpu", 1.0));
        store.add_message("m1");
        assert_eq!(store.batches("m1").unwrap().len(), 1);
    }

    #[test]
    fn test_all_groups_snapshot() {
        let store = AggregationStore::new();
        store.add_metric("m1", batch("cpu", 1.0));

        let snapshot = store.all_groups();
        store.add_metric("m1", batch("cpu", 2.0));

        assert_eq!(snapshot["m1"].len(), 1);
        assert_eq!(store.all_groups()["m1"].len(), 2);
        assert!(store.contains("m1"));
        assert!(!store.contains("m2"));
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(AggregationStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        store.add_metric("shared", batch("cpu", (i * 100 + j) as f64));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.batches("shared").unwrap().len(), 800);
    }
}
