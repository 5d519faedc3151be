use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unable to establish a remote connection: {0}")]
    ConnectionFailed(String),

    #[error("No socket endpoint connected")]
    NoEndpoint,

    #[error("No file handle open")]
    NoFileHandle,

    #[error("Short datagram write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
