//! Sink listener and publisher

use crate::aggregation::AggregationStore;
use crate::dispatcher::GraphiteDispatcher;
use crate::metrics::{record_connection_closed, record_connection_opened, record_publisher_frame};
use crate::router::MessageRouter;
use crate::sink::config::{Framing, SinkConfig};
use crate::sink::error::{SinkError, SinkResult};
use crate::sink::framing::read_frame;
use crate::sink::handler::MessageHandler;
use crate::tally::{OutcomeReport, OutcomeTally};
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

/// A live agent connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: u64,
    pub peer: SocketAddr,
    pub connected_at: Instant,
}

/// State shared between the sink and its accept/connection tasks
struct ListenerState {
    handler: Arc<dyn MessageHandler>,
    connections: DashMap<u64, ConnectionInfo>,
    next_connection_id: AtomicU64,
    listening: AtomicBool,
    shutdown: Notify,
    framing: Framing,
    max_frame_size: usize,
}

/// Removes a connection record when its task ends, however it ends
struct ConnectionGuard {
    id: u64,
    state: Arc<ListenerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some((_, info)) = self.state.connections.remove(&self.id) {
            record_connection_closed();
            tracing::debug!(id = self.id, peer = %info.peer, "connection closed");
        }
    }
}

/// The metric-relay node
pub struct Sink {
    config: SinkConfig,
    state: Arc<ListenerState>,
    local_addr: OnceLock<SocketAddr>,
    accept_task: SyncMutex<Option<JoinHandle<()>>>,
    /// Outbound connection to the coordinating server; writes are serialized
    publisher: Mutex<Option<TcpStream>>,
}

impl Sink {
    pub fn new(config: SinkConfig, handler: Arc<dyn MessageHandler>) -> Self {
        let state = Arc::new(ListenerState {
            handler,
            connections: DashMap::new(),
            next_connection_id: AtomicU64::new(0),
            listening: AtomicBool::new(false),
            shutdown: Notify::new(),
            framing: config.framing,
            max_frame_size: config.max_frame_size,
        });

        Self {
            config,
            state,
            local_addr: OnceLock::new(),
            accept_task: SyncMutex::new(None),
            publisher: Mutex::new(None),
        }
    }

    /// Assemble a sink that routes into a fresh store and tally and forwards
    /// to the configured graphite backend.
    pub async fn graphite_relay(config: SinkConfig) -> (Self, Arc<MessageRouter>) {
        let dispatcher =
            GraphiteDispatcher::tcp(config.backend_host.clone(), config.backend_port).await;
        let router = Arc::new(MessageRouter::new(
            Arc::new(AggregationStore::new()),
            Arc::new(OutcomeTally::new()),
            Box::new(dispatcher),
        ));
        let sink = Self::new(config, router.clone());
        (sink, router)
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Bound listener address, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening.load(Ordering::SeqCst)
    }

    /// Number of live agent connections
    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        let mut connections: Vec<_> = self
            .state
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        connections.sort_by_key(|c| c.id);
        connections
    }

    /// Start listening, then subscribe to the coordinating server.
    ///
    /// Returns once the publisher handshake has been sent. If the handshake
    /// fails the listener keeps running and the error is returned.
    pub async fn start(&self) -> SinkResult<()> {
        self.config.validate()?;

        if self.state.listening.swap(true, Ordering::SeqCst) {
            return Err(SinkError::AlreadyStarted);
        }

        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                self.state.listening.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);
        tracing::info!(%addr, backlog = self.config.backlog, framing = %self.config.framing, "sink listening");

        let handle = tokio::spawn(accept_loop(listener, self.state.clone()));
        *self.accept_task.lock() = Some(handle);

        self.start_publisher().await
    }

    async fn bind(&self) -> SinkResult<TcpListener> {
        let target = format!("{}:{}", self.config.sink_host, self.config.sink_port);
        let bind_err = |reason: String| SinkError::Bind {
            addr: target.clone(),
            reason,
        };

        let addr = tokio::net::lookup_host((self.config.sink_host.as_str(), self.config.sink_port))
            .await
            .map_err(|e| bind_err(e.to_string()))?
            .next()
            .ok_or_else(|| bind_err("address did not resolve".into()))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| bind_err(e.to_string()))?;

        socket
            .set_reuseaddr(true)
            .map_err(|e| bind_err(e.to_string()))?;
        socket.bind(addr).map_err(|e| bind_err(e.to_string()))?;
        socket
            .listen(self.config.backlog)
            .map_err(|e| bind_err(e.to_string()))
    }

    async fn start_publisher(&self) -> SinkResult<()> {
        let server = format!("{}:{}", self.config.server_host, self.config.server_port);

        let mut stream =
            TcpStream::connect((self.config.server_host.as_str(), self.config.server_port))
                .await
                .map_err(|e| SinkError::ConnectionFailed(format!("{}: {}", server, e)))?;

        let subscription = format!("SINK: {}", self.config.sink_host);
        stream.write_all(subscription.as_bytes()).await?;

        *self.publisher.lock().await = Some(stream);
        tracing::info!(%server, "subscribed to coordinating server");
        Ok(())
    }

    /// Send a frame to the coordinating server
    pub async fn send_message(&self, message: &[u8]) -> SinkResult<()> {
        if message.len() > self.config.max_frame_size {
            return Err(SinkError::MessageTooLarge {
                size: message.len(),
                limit: self.config.max_frame_size,
            });
        }

        let mut publisher = self.publisher.lock().await;
        let stream = publisher
            .as_mut()
            .ok_or(SinkError::PublisherNotConnected)?;
        stream.write_all(message).await?;

        record_publisher_frame(message.len());
        Ok(())
    }

    /// Publish the current outcome of `message_id` as a JSON status frame
    pub async fn publish_outcome(
        &self,
        message_id: &str,
        tally: &OutcomeTally,
    ) -> SinkResult<OutcomeReport> {
        let report = tally.report(message_id)?;
        let frame = serde_json::to_vec(&report)?;
        self.send_message(&frame).await?;
        tracing::debug!(message_id, outcome = %report.outcome, "outcome published");
        Ok(report)
    }

    /// Stop accepting connections and drop the publisher.
    ///
    /// Connections already being served run until their peers close.
    pub async fn stop(&self) {
        self.state.listening.store(false, Ordering::SeqCst);
        self.state.shutdown.notify_one();

        let accept_task = self.accept_task.lock().take();
        if let Some(handle) = accept_task {
            let _ = handle.await;
        }

        let publisher = self.publisher.lock().await.take();
        if let Some(mut stream) = publisher {
            let _ = stream.shutdown().await;
        }

        tracing::info!("sink stopped");
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<ListenerState>) {
    while state.listening.load(Ordering::SeqCst) {
        tokio::select! {
            _ = state.shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawn_connection(stream, peer, &state),
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
        }
    }
    tracing::debug!("accept loop exited");
}

fn spawn_connection(stream: TcpStream, peer: SocketAddr, state: &Arc<ListenerState>) {
    let id = state.next_connection_id.fetch_add(1, Ordering::Relaxed);
    state.connections.insert(
        id,
        ConnectionInfo {
            id,
            peer,
            connected_at: Instant::now(),
        },
    );
    record_connection_opened();
    tracing::debug!(id, %peer, "connection accepted");

    let guard = ConnectionGuard {
        id,
        state: state.clone(),
    };
    tokio::spawn(async move {
        serve_connection(stream, peer, &guard.state).await;
        drop(guard);
    });
}

async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, state: &ListenerState) {
    let mut buf = vec![0u8; state.max_frame_size];

    loop {
        match read_frame(&mut stream, state.framing, &mut buf, state.max_frame_size).await {
            Ok(Some(payload)) => {
                state.handler.handle(&payload).await;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "dropping connection");
                break;
            }
        }
    }
}

/// Builder for sinks
pub struct SinkBuilder {
    config: SinkConfig,
    handler: Option<Arc<dyn MessageHandler>>,
}

impl SinkBuilder {
    pub fn new() -> Self {
        Self {
            config: SinkConfig::default(),
            handler: None,
        }
    }

    pub fn config(mut self, config: SinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config = self.config.with_sink_addr(host, port);
        self
    }

    pub fn server_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config = self.config.with_server_addr(host, port);
        self
    }

    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    pub fn handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> SinkResult<Sink> {
        self.config.validate()?;
        let handler = self
            .handler
            .ok_or_else(|| SinkError::InvalidConfig("a message handler is required".into()))?;
        Ok(Sink::new(self.config, handler))
    }
}

impl Default for SinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::framing::encode_length_prefixed;
    use crate::sink::handler::LoggingHandler;
    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc;

    /// Forwards every payload to a channel
    struct ChannelHandler {
        tx: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl MessageHandler for ChannelHandler {
        async fn handle(&self, payload: &[u8]) -> bool {
            let _ = self.tx.send(payload.to_vec());
            true
        }
    }

    /// Coordinating server stand-in; yields the accepted publisher stream
    async fn coordinator() -> (u16, JoinHandle<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        (port, handle)
    }

    async fn started_sink(
        framing: Framing,
    ) -> (Sink, mpsc::UnboundedReceiver<Vec<u8>>, TcpStream) {
        let (server_port, server) = coordinator().await;
        let (tx, rx) = mpsc::unbounded_channel();

        let sink = SinkBuilder::new()
            .sink_addr("127.0.0.1", 0)
            .server_addr("127.0.0.1", server_port)
            .framing(framing)
            .handler(Arc::new(ChannelHandler { tx }))
            .build()
            .unwrap();
        sink.start().await.unwrap();

        let mut publisher_peer = server.await.unwrap();
        let mut handshake = vec![0u8; "SINK: 127.0.0.1".len()];
        publisher_peer.read_exact(&mut handshake).await.unwrap();
        assert_eq!(handshake, b"SINK: 127.0.0.1");

        (sink, rx, publisher_peer)
    }

    async fn wait_for_connections(sink: &Sink, expected: usize) {
        for _ in 0..200 {
            if sink.connection_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} connections, found {}",
            expected,
            sink.connection_count()
        );
    }

    #[tokio::test]
    async fn test_start_sends_handshake() {
        let (sink, _rx, _peer) = started_sink(Framing::PerRead).await;

        assert!(sink.is_listening());
        assert!(sink.local_addr().is_some());
        sink.stop().await;
        assert!(!sink.is_listening());
    }

    #[tokio::test]
    async fn test_start_twice() {
        let (sink, _rx, _peer) = started_sink(Framing::PerRead).await;
        assert!(matches!(sink.start().await, Err(SinkError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_handshake_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = listener.local_addr().unwrap().port();
        drop(listener);

        let sink = Sink::new(
            SinkConfig::default()
                .with_sink_addr("127.0.0.1", 0)
                .with_server_addr("127.0.0.1", dead_port),
            Arc::new(LoggingHandler),
        );

        assert!(matches!(
            sink.start().await,
            Err(SinkError::ConnectionFailed(_))
        ));
        assert!(matches!(
            sink.send_message(b"status").await,
            Err(SinkError::PublisherNotConnected)
        ));
        sink.stop().await;
    }

    #[tokio::test]
    async fn test_send_message_limit() {
        let (sink, _rx, mut peer) = started_sink(Framing::PerRead).await;

        let oversized = vec![b'a'; 32001];
        assert!(matches!(
            sink.send_message(&oversized).await,
            Err(SinkError::MessageTooLarge {
                size: 32001,
                limit: 32000
            })
        ));

        let exact = vec![b'b'; 32000];
        sink.send_message(&exact).await.unwrap();

        let mut received = vec![0u8; 32000];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(received, exact);
    }

    #[tokio::test]
    async fn test_send_message_before_start() {
        let sink = Sink::new(SinkConfig::default(), Arc::new(LoggingHandler));
        assert!(matches!(
            sink.send_message(b"x").await,
            Err(SinkError::PublisherNotConnected)
        ));
    }

    #[tokio::test]
    async fn test_inbound_frames_reach_handler_in_order() {
        let (sink, mut rx, _peer) = started_sink(Framing::LengthPrefixed).await;
        let addr = sink.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        for payload in [&b"one"[..], b"two", b"three"] {
            client
                .write_all(&encode_length_prefixed(payload))
                .await
                .unwrap();
        }

        assert_eq!(rx.recv().await.unwrap(), b"one");
        assert_eq!(rx.recv().await.unwrap(), b"two");
        assert_eq!(rx.recv().await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_connection_records_removed_on_close() {
        let (sink, mut rx, _peer) = started_sink(Framing::PerRead).await;
        let addr = sink.local_addr().unwrap();

        let mut first = TcpStream::connect(addr).await.unwrap();
        let second = TcpStream::connect(addr).await.unwrap();
        wait_for_connections(&sink, 2).await;

        first.write_all(b"payload").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), b"payload");

        drop(first);
        wait_for_connections(&sink, 1).await;
        assert_eq!(sink.connections().len(), 1);

        drop(second);
        wait_for_connections(&sink, 0).await;
    }

    #[tokio::test]
    async fn test_stop_closes_listener() {
        let (sink, _rx, _peer) = started_sink(Framing::PerRead).await;
        let addr = sink.local_addr().unwrap();

        sink.stop().await;

        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_outcome() {
        let (sink, _rx, mut peer) = started_sink(Framing::PerRead).await;
        let tally = OutcomeTally::new();
        tally.negative_vote("m1");

        let report = sink.publish_outcome("m1", &tally).await.unwrap();
        assert_eq!(report, OutcomeReport::new("m1", -1));

        let expected = br#"{"message_id":"m1","outcome":"FATAL","votes":-1}"#;
        let mut received = vec![0u8; expected.len()];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected);

        assert!(matches!(
            sink.publish_outcome("unknown", &tally).await,
            Err(SinkError::Tally(_))
        ));
    }

    #[test]
    fn test_builder_requires_handler() {
        assert!(matches!(
            SinkBuilder::new().build(),
            Err(SinkError::InvalidConfig(_))
        ));
        assert!(SinkBuilder::default()
            .handler(Arc::new(LoggingHandler))
            .build()
            .is_ok());
    }
}
