//! Transport contract

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fedpro_core::RtiError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("connection lost: {0}")]
    Disconnected(String),

    #[error("could not connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("transport already started")]
    AlreadyStarted,
}

pub type TransportResult<T> = Result<T, TransportError>;

impl From<TransportError> for RtiError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed | TransportError::Disconnected(_) => {
                RtiError::NotConnected(e.to_string())
            }
            TransportError::ConnectFailed { .. }
            | TransportError::UnsupportedProtocol(_)
            | TransportError::AlreadyStarted => RtiError::ConnectionFailed(e.to_string()),
        }
    }
}

/// Wire protocol used to reach the coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Tls,
    WebSocket,
    WebSocketSecure,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Tls => "tls",
            Protocol::WebSocket => "websocket",
            Protocol::WebSocketSecure => "websocketsecure",
        }
    }
}

impl FromStr for Protocol {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "tls" => Ok(Protocol::Tls),
            "websocket" => Ok(Protocol::WebSocket),
            "websocketsecure" => Ok(Protocol::WebSocketSecure),
            _ => Err(TransportError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where and how to reach the coordinator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub connect_timeout: Duration,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Receives everything the coordinator sends.
///
/// Called from the transport's reader thread, one packet at a time and in
/// arrival order. `on_connection_lost` is called at most once, after which
/// no more packets arrive.
pub trait InboundSink: Send + Sync {
    fn on_frame(&self, packet: Bytes);
    fn on_connection_lost(&self, reason: &str);
}

/// An ordered, reliable, bidirectional packet channel
pub trait Transport: Send + Sync {
    /// Begin delivering inbound packets to `sink`.
    fn start(&self, sink: Arc<dyn InboundSink>) -> TransportResult<()>;

    /// Queue one complete packet for transmission.
    fn send(&self, packet: Bytes) -> TransportResult<()>;

    /// Shut the channel down. Does not report connection loss.
    fn close(&self);

    /// Packets accepted by `send` so far
    fn frames_sent(&self) -> u64;
}

/// Opens transports
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> TransportResult<Box<dyn Transport>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_case_insensitive() {
        assert_eq!("TCP".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("WebSocketSecure".parse::<Protocol>().unwrap(), Protocol::WebSocketSecure);
        assert!(matches!(
            "udp".parse::<Protocol>(),
            Err(TransportError::UnsupportedProtocol(_))
        ));
    }

    #[test]
    fn test_protocol_serde_names() {
        assert_eq!(serde_json::to_string(&Protocol::WebSocket).unwrap(), "\"websocket\"");
        let back: Protocol = serde_json::from_str("\"tls\"").unwrap();
        assert_eq!(back, Protocol::Tls);
    }

    #[test]
    fn test_error_conversion() {
        assert!(matches!(RtiError::from(TransportError::Closed), RtiError::NotConnected(_)));
        let failed = TransportError::ConnectFailed {
            endpoint: "tcp://localhost:15164".into(),
            reason: "refused".into(),
        };
        assert!(matches!(RtiError::from(failed), RtiError::ConnectionFailed(_)));
    }

    #[test]
    fn test_endpoint_display() {
        let ep = Endpoint {
            host: "rti.local".into(),
            port: 15164,
            protocol: Protocol::Tcp,
            connect_timeout: Duration::from_secs(5),
        };
        assert_eq!(ep.to_string(), "tcp://rti.local:15164");
    }
}
