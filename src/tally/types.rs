use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a message's processing history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// More failures than successes
    Fatal,
    /// Successes and failures cancel out
    Warning,
    /// More successes than failures
    Success,
}

impl Outcome {
    /// Classify a net vote count
    pub fn from_votes(votes: i64) -> Self {
        match votes {
            v if v < 0 => Outcome::Fatal,
            0 => Outcome::Warning,
            _ => Outcome::Success,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Fatal => "FATAL",
            Outcome::Warning => "WARNING",
            Outcome::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status frame published to the coordinating server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub message_id: String,
    pub outcome: Outcome,
    pub votes: i64,
}

impl OutcomeReport {
    pub fn new(message_id: impl Into<String>, votes: i64) -> Self {
        Self {
            message_id: message_id.into(),
            outcome: Outcome::from_votes(votes),
            votes,
        }
    }
}
