//! Metric data model

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One `(timestamp, value)` observation.
///
/// On the wire a sample is a two element array `[timestamp, value]`.
/// Fractional timestamps are truncated toward zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub timestamp: i64,
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl Serialize for MetricSample {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.timestamp, self.value).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MetricSample {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (timestamp, value) = <(serde_json::Number, f64)>::deserialize(deserializer)?;
        let timestamp = match timestamp.as_i64() {
            Some(ts) => ts,
            None => timestamp.as_f64().unwrap_or_default() as i64,
        };
        Ok(Self { timestamp, value })
    }
}

/// Named metric series delivered in a single payload.
///
/// Names are unique within a batch and keep the order they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricBatch {
    series: IndexMap<String, Vec<MetricSample>>,
}

impl MetricBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any series already stored under `name`
    pub fn with_series(mut self, name: impl Into<String>, samples: Vec<MetricSample>) -> Self {
        self.series.insert(name.into(), samples);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[MetricSample]> {
        self.series.get(name).map(Vec::as_slice)
    }

    /// Metric names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MetricSample])> {
        self.series
            .iter()
            .map(|(name, samples)| (name.as_str(), samples.as_slice()))
    }

    /// Number of metric series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total samples across every series
    pub fn sample_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<MetricSample>)> for MetricBatch {
    fn from_iter<I: IntoIterator<Item = (N, Vec<MetricSample>)>>(iter: I) -> Self {
        Self {
            series: iter
                .into_iter()
                .map(|(name, samples)| (name.into(), samples))
                .collect(),
        }
    }
}

/// Decoded form of one accepted inbound payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMessage {
    /// Host the metrics were collected on
    pub host: String,

    /// Identifier correlating batches and votes
    pub message_id: String,

    /// Metric series carried by this payload
    pub metrics: MetricBatch,

    /// Error reported by the agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricMessage {
    pub fn new(host: impl Into<String>, message_id: impl Into<String>, metrics: MetricBatch) -> Self {
        Self {
            host: host.into(),
            message_id: message_id.into(),
            metrics,
            error: None,
        }
    }

    pub fn is_erroneous(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_from_wire_pair() {
        let sample: MetricSample = serde_json::from_str("[100, 0.5]").unwrap();
        assert_eq!(sample, MetricSample::new(100, 0.5));

        let sample: MetricSample = serde_json::from_str("[1508832000.75, 3]").unwrap();
        assert_eq!(sample.timestamp, 1508832000);
        assert_eq!(sample.value, 3.0);
    }

    #[test]
    fn test_sample_rejects_bad_shape() {
        assert!(serde_json::from_str::<MetricSample>("[100]").is_err());
        assert!(serde_json::from_str::<MetricSample>("[100, \"x\"]").is_err());
        assert!(serde_json::from_str::<MetricSample>("{\"ts\": 1}").is_err());
    }

    #[test]
    fn test_batch_preserves_name_order() {
        let batch: MetricBatch =
            serde_json::from_str(r#"{"mem": [[1, 2]], "cpu": [[1, 0.5]], "disk": []}"#).unwrap();

        let names: Vec<_> = batch.names().collect();
        assert_eq!(names, vec!["mem", "cpu", "disk"]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.sample_count(), 2);
        assert_eq!(batch.get("cpu"), Some(&[MetricSample::new(1, 0.5)][..]));
    }

    #[test]
    fn test_batch_serializes_as_wire_object() {
        let batch = MetricBatch::new().with_series("cpu", vec![MetricSample::new(100, 0.5)]);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json, serde_json::json!({"cpu": [[100, 0.5]]}));
    }

    #[test]
    fn test_metric_message() {
        let message = MetricMessage::new("h1", "m1", MetricBatch::new());
        assert!(!message.is_erroneous());
        assert!(message.metrics.is_empty());
    }
}
