//! Inbound message handler seam

use async_trait::async_trait;

/// Receives every inbound frame from every connection.
///
/// Frames from one connection are handed over in arrival order; frames from
/// different connections may arrive concurrently.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one frame, returning whether it was accepted
    async fn handle(&self, payload: &[u8]) -> bool;
}

/// Handler that only logs what it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, payload: &[u8]) -> bool {
        tracing::info!(
            len = payload.len(),
            payload = %String::from_utf8_lossy(payload),
            "message received"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_handler_accepts() {
        assert!(LoggingHandler.handle(b"anything").await);
        assert!(LoggingHandler.handle(b"").await);
    }
}
