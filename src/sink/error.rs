use crate::tally::TallyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publisher is not connected")]
    PublisherNotConnected,

    #[error("Message of {size} bytes exceeds the {limit} byte frame limit")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Sink already started")]
    AlreadyStarted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tally error: {0}")]
    Tally(#[from] TallyError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}

pub type SinkResult<T> = Result<T, SinkError>;
