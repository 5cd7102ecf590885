//! Transport seam between workers and the service
//!
//! A [`Connector`] opens one [`Transport`] per worker. The websocket
//! implementation talks to a real service; the loopback hub stands in for
//! one in-process.

use async_trait::async_trait;
use treeload_core::WorkerId;

use crate::error::TransportError;

pub mod loopback;
pub mod websocket;

pub use loopback::{LoopbackHub, LoopbackTransport};
pub use websocket::{WebSocketConnector, WebSocketTransport};

/// One inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
}

/// An open, bidirectional connection
#[async_trait]
pub trait Transport: Send {
    /// Send one binary frame
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Next inbound frame; `Ok(None)` once the peer has closed.
    ///
    /// Must be cancel safe: the worker polls it inside `select!`.
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Result of a successful open
pub struct Connection {
    /// Handshake status reported by the service
    pub status: u16,
    pub transport: Box<dyn Transport>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Opens connections to the service
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, worker_id: WorkerId) -> Result<Connection, TransportError>;

    /// Short description for logs
    fn describe(&self) -> String;
}
