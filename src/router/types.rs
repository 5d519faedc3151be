//! Inbound wire format and routing results

use crate::aggregation::{MetricBatch, MetricMessage};
use crate::dispatcher::DispatchReport;
use crate::router::error::{RouterError, RouterResult};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Raw inbound payload as sent by an agent:
///
/// `{"host": .., "message_id": .., "metrics": {name: [[ts, value], ..]}, "error"?: ..}`
#[derive(Debug, Clone, Deserialize)]
pub struct InboundPayload {
    pub host: String,
    pub message_id: String,

    /// Raw batch; only parsed once the payload is known to be error-free
    #[serde(default)]
    pub metrics: Option<Value>,

    /// `Some` whenever the key is present, including an explicit `null`
    #[serde(default, deserialize_with = "present_value")]
    pub error: Option<Value>,
}

/// Keeps a present key distinguishable from a missing one; `Option<Value>`
/// alone would fold `null` into `None`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl InboundPayload {
    pub fn decode(payload: &[u8]) -> RouterResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn is_erroneous(&self) -> bool {
        self.error.is_some()
    }

    /// Validate into a [`MetricMessage`].
    ///
    /// Erroneous payloads may omit `metrics` and their batch is never parsed;
    /// every other payload must carry a well-formed one.
    pub fn into_message(self) -> RouterResult<MetricMessage> {
        if let Some(value) = self.error {
            let error = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            return Ok(MetricMessage {
                host: self.host,
                message_id: self.message_id,
                metrics: MetricBatch::default(),
                error: Some(error),
            });
        }

        let metrics = match self.metrics {
            Some(value) => serde_json::from_value::<MetricBatch>(value)?,
            None => {
                return Err(RouterError::InvalidPayload(format!(
                    "message {} is missing metrics",
                    self.message_id
                )))
            }
        };

        Ok(MetricMessage {
            host: self.host,
            message_id: self.message_id,
            metrics,
            error: None,
        })
    }
}

/// How an accepted payload was applied
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Grouped, voted up and forwarded to the backend
    Accepted {
        message_id: String,
        votes: i64,
        dispatch: DispatchReport,
    },

    /// Carried an error indicator; voted down only
    Erroneous {
        message_id: String,
        votes: i64,
        error: String,
    },
}

impl Routed {
    pub fn message_id(&self) -> &str {
        match self {
            Routed::Accepted { message_id, .. } | Routed::Erroneous { message_id, .. } => {
                message_id
            }
        }
    }

    /// Net vote count after this message was applied
    pub fn votes(&self) -> i64 {
        match self {
            Routed::Accepted { votes, .. } | Routed::Erroneous { votes, .. } => *votes,
        }
    }
}
