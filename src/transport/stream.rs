//! Socket transports (TCP stream and connected UDP datagram)

use crate::transport::error::{TransportError, TransportResult};
use crate::transport::types::ErrorLog;
use crate::transport::Transport;
use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

/// TCP stream transport
pub struct StreamTransport {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    errors: ErrorLog,
}

impl StreamTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
            errors: ErrorLog::new(),
        }
    }

    /// Share an existing error log instead of owning a fresh one
    pub fn with_error_log(mut self, errors: ErrorLog) -> Self {
        self.errors = errors;
        self
    }

    /// Remote endpoint as `host:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn fail(&self, err: TransportError) -> TransportError {
        self.errors.record(err.to_string());
        err
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn connect(&mut self) -> TransportResult<()> {
        match TcpStream::connect((self.host.as_str(), self.port)).await {
            Ok(stream) => {
                tracing::debug!(endpoint = %self.endpoint(), "stream transport connected");
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => Err(self.fail(TransportError::ConnectionFailed(format!(
                "{}: {}",
                self.endpoint(),
                e
            )))),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let result = match self.stream.as_mut() {
            None => Err(TransportError::NoEndpoint),
            Some(stream) => stream.write_all(bytes).await.map_err(TransportError::from),
        };
        result.map_err(|e| self.fail(e))
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn error_log(&self) -> &ErrorLog {
        &self.errors
    }
}

/// Connected UDP transport; each write is sent as one datagram
pub struct DatagramTransport {
    host: String,
    port: u16,
    socket: Option<UdpSocket>,
    errors: ErrorLog,
}

impl DatagramTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket: None,
            errors: ErrorLog::new(),
        }
    }

    pub fn with_error_log(mut self, errors: ErrorLog) -> Self {
        self.errors = errors;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn fail(&self, err: TransportError) -> TransportError {
        self.errors.record(err.to_string());
        err
    }

    async fn open_socket(&self) -> std::io::Result<UdpSocket> {
        let remote = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "host did not resolve")
            })?;

        let local: SocketAddr = if remote.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        Ok(socket)
    }
}

#[async_trait]
impl Transport for DatagramTransport {
    async fn connect(&mut self) -> TransportResult<()> {
        match self.open_socket().await {
            Ok(socket) => {
                tracing::debug!(endpoint = %self.endpoint(), "datagram transport connected");
                self.socket = Some(socket);
                Ok(())
            }
            Err(e) => Err(self.fail(TransportError::ConnectionFailed(format!(
                "{}: {}",
                self.endpoint(),
                e
            )))),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let result = match self.socket.as_ref() {
            None => Err(TransportError::NoEndpoint),
            Some(socket) => match socket.send(bytes).await {
                Ok(sent) if sent == bytes.len() => Ok(()),
                Ok(sent) => Err(TransportError::ShortWrite {
                    sent,
                    expected: bytes.len(),
                }),
                Err(e) => Err(e.into()),
            },
        };
        result.map_err(|e| self.fail(e))
    }

    async fn close(&mut self) {
        self.socket = None;
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn error_log(&self) -> &ErrorLog {
        &self.errors
    }
}
