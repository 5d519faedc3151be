//! Per-message signed vote counter

use crate::tally::error::{TallyError, TallyResult};
use crate::tally::types::{Outcome, OutcomeReport};
use dashmap::DashMap;

/// Net vote count per message id.
///
/// Votes go through the map's per-shard entry lock, so concurrent votes on the
/// same id from different connections are never lost.
#[derive(Debug, Default)]
pub struct OutcomeTally {
    votes: DashMap<String, i64>,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful, error-free message
    pub fn positive_vote(&self, message_id: &str) -> i64 {
        self.adjust(message_id, 1)
    }

    /// Record a message that reported an error
    pub fn negative_vote(&self, message_id: &str) -> i64 {
        self.adjust(message_id, -1)
    }

    fn adjust(&self, message_id: &str, delta: i64) -> i64 {
        let mut entry = self.votes.entry(message_id.to_string()).or_insert(0);
        *entry += delta;
        *entry
    }

    /// Current net vote count, if the id was ever voted on
    pub fn votes(&self, message_id: &str) -> Option<i64> {
        self.votes.get(message_id).map(|v| *v)
    }

    /// Classify the current count; ids with no votes are an error
    pub fn outcome(&self, message_id: &str) -> TallyResult<Outcome> {
        self.votes(message_id)
            .map(Outcome::from_votes)
            .ok_or_else(|| TallyError::UnknownMessage(message_id.to_string()))
    }

    pub fn report(&self, message_id: &str) -> TallyResult<OutcomeReport> {
        self.votes(message_id)
            .map(|votes| OutcomeReport::new(message_id, votes))
            .ok_or_else(|| TallyError::UnknownMessage(message_id.to_string()))
    }

    /// Every tallied id with its count, sorted by id
    pub fn snapshot(&self) -> Vec<OutcomeReport> {
        let mut reports: Vec<_> = self
            .votes
            .iter()
            .map(|entry| OutcomeReport::new(entry.key().clone(), *entry.value()))
            .collect();
        reports.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        reports
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_single_positive_is_success() {
        let tally = OutcomeTally::new();
        assert_eq!(tally.positive_vote("m1"), 1);
        assert_eq!(tally.outcome("m1").unwrap(), Outcome::Success);
    }

    #[test]
    fn test_mixed_votes_are_warning_in_either_order() {
        let tally = OutcomeTally::new();

        tally.positive_vote("a");
        tally.negative_vote("a");
        tally.negative_vote("b");
        tally.positive_vote("b");

        assert_eq!(tally.outcome("a").unwrap(), Outcome::Warning);
        assert_eq!(tally.outcome("b").unwrap(), Outcome::Warning);
    }

    #[test]
    fn test_net_negative_is_fatal() {
        let tally = OutcomeTally::new();

        tally.negative_vote("m1");
        tally.positive_vote("m1");
        tally.negative_vote("m1");
        tally.negative_vote("m1");

        assert_eq!(tally.votes("m1"), Some(-2));
        assert_eq!(tally.outcome("m1").unwrap(), Outcome::Fatal);
    }

    #[test]
    fn test_unknown_message() {
        let tally = OutcomeTally::new();
        assert_eq!(
            tally.outcome("nope"),
            Err(TallyError::UnknownMessage("nope".into()))
        );
        assert!(tally.report("nope").is_err());
        assert!(tally.votes("nope").is_none());
    }

    #[test]
    fn test_outcome_stable_between_votes() {
        let tally = OutcomeTally::new();
        tally.negative_vote("m1");

        for _ in 0..10 {
            assert_eq!(tally.outcome("m1").unwrap(), Outcome::Fatal);
        }
        assert_eq!(tally.votes("m1"), Some(-1));
    }

    #[test]
    fn test_snapshot_sorted() {
        let tally = OutcomeTally::new();
        tally.positive_vote("z");
        tally.negative_vote("a");

        let snapshot = tally.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], OutcomeReport::new("a", -1));
        assert_eq!(snapshot[1].outcome, Outcome::Success);
    }

    #[test]
    fn test_concurrent_votes_not_lost() {
        let tally = Arc::new(OutcomeTally::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tally = tally.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        tally.positive_vote("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tally.votes("shared"), Some(16_000));
    }
}
