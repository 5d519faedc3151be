//! Sink configuration

use crate::sink::error::{SinkError, SinkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Largest frame read from an agent or sent to the coordinating server
pub const DEFAULT_MAX_FRAME_SIZE: usize = 32000;

/// How inbound frames are delimited on an agent connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Each socket read (up to the frame limit) is one payload
    #[default]
    PerRead,

    /// A 4 byte big-endian length followed by exactly that many bytes
    LengthPrefixed,
}

impl FromStr for Framing {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_read" => Ok(Framing::PerRead),
            "length_prefixed" => Ok(Framing::LengthPrefixed),
            other => Err(SinkError::InvalidConfig(format!("unknown framing: {}", other))),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::PerRead => f.write_str("per_read"),
            Framing::LengthPrefixed => f.write_str("length_prefixed"),
        }
    }
}

/// Configuration for a sink, passed explicitly into [`Sink`](crate::sink::Sink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Address agents connect to; also advertised in the publisher handshake
    pub sink_host: String,
    pub sink_port: u16,

    /// Coordinating server the publisher connects to
    pub server_host: String,
    pub server_port: u16,

    /// Pending connection backlog for the listener
    pub backlog: u32,

    /// Metrics backend (graphite plaintext)
    pub backend_host: String,
    pub backend_port: u16,

    /// Frame size limit in bytes
    pub max_frame_size: usize,

    pub framing: Framing,

    /// Serve the sink's own metrics for Prometheus when set
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sink_host: "127.0.0.1".to_string(),
            sink_port: 5201,
            server_host: "127.0.0.1".to_string(),
            server_port: 5200,
            backlog: 1024,
            backend_host: "127.0.0.1".to_string(),
            backend_port: 2004,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            framing: Framing::PerRead,
            metrics_addr: None,
        }
    }
}

impl SinkConfig {
    /// Build from the process environment, falling back to defaults
    pub fn from_env() -> SinkResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> SinkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            sink_host: lookup("BOLT_SINK_HOST").unwrap_or(defaults.sink_host),
            sink_port: parse_var(&lookup, "BOLT_SINK_PORT", defaults.sink_port)?,
            server_host: lookup("BOLT_SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var(&lookup, "BOLT_SERVER_PORT", defaults.server_port)?,
            backlog: parse_var(&lookup, "BOLT_SINK_QUEUE_SIZE", defaults.backlog)?,
            backend_host: lookup("GRAPHITE_HOST").unwrap_or(defaults.backend_host),
            backend_port: parse_var(&lookup, "GRAPHITE_PORT", defaults.backend_port)?,
            max_frame_size: defaults.max_frame_size,
            framing: parse_var(&lookup, "BOLT_SINK_FRAMING", defaults.framing)?,
            metrics_addr: lookup("BOLT_SINK_METRICS_ADDR")
                .map(|addr| {
                    addr.parse().map_err(|_| {
                        SinkError::InvalidConfig(format!("BOLT_SINK_METRICS_ADDR={}", addr))
                    })
                })
                .transpose()?,
        })
    }

    pub fn with_sink_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.sink_host = host.into();
        self.sink_port = port;
        self
    }

    pub fn with_server_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server_host = host.into();
        self.server_port = port;
        self
    }

    pub fn with_backend_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.backend_host = host.into();
        self.backend_port = port;
        self
    }

    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn validate(&self) -> SinkResult<()> {
        if self.max_frame_size == 0 {
            return Err(SinkError::InvalidConfig("max_frame_size must be > 0".into()));
        }
        if self.backlog == 0 {
            return Err(SinkError::InvalidConfig("backlog must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> SinkResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SinkError::InvalidConfig(format!("{}={}", name, raw))),
    }
}
