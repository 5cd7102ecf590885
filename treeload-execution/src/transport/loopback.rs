//! In-process stand-in for the document sync service
//!
//! Every CHANGES message is fanned out as one ADD notification per record to
//! every connected worker, the sender included. CONNECT is answered with
//! ON_CONNECT and PING with PONG.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};
use treeload_core::WorkerId;
use treeload_protocol::{Codec, InboundMessage, OutboundMessage};

use super::{Connection, Connector, Frame, Transport};
use crate::error::TransportError;

/// Switching Protocols
const UPGRADE_STATUS: u16 = 101;

/// Counters describing what the hub has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: u64,
    pub changes_messages: u64,
    pub notifications_sent: u64,
    pub pings: u64,
}

struct HubInner {
    peers: Mutex<HashMap<u64, mpsc::UnboundedSender<Frame>>>,
    next_connection: AtomicU64,
    codec: Codec,
    compress: bool,
    status: u16,
    changes_messages: AtomicU64,
    notifications_sent: AtomicU64,
    pings: AtomicU64,
}

/// Shared handle onto one in-process hub
#[derive(Clone)]
pub struct LoopbackHub {
    inner: Arc<HubInner>,
}

impl LoopbackHub {
    /// `compress` gzips every response the hub sends
    pub fn new(compress: bool) -> Self {
        Self::with_status(compress, UPGRADE_STATUS)
    }

    /// Hub that reports `status` as the handshake result
    pub fn with_status(compress: bool, status: u16) -> Self {
        Self {
            inner: Arc::new(HubInner {
                peers: Mutex::new(HashMap::new()),
                next_connection: AtomicU64::new(0),
                codec: Codec::new(true),
                compress,
                status,
                changes_messages: AtomicU64::new(0),
                notifications_sent: AtomicU64::new(0),
                pings: AtomicU64::new(0),
            }),
        }
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.inner.next_connection.load(Ordering::Relaxed),
            changes_messages: self.inner.changes_messages.load(Ordering::Relaxed),
            notifications_sent: self.inner.notifications_sent.load(Ordering::Relaxed),
            pings: self.inner.pings.load(Ordering::Relaxed),
        }
    }

    /// Number of connections not yet closed
    pub async fn open_connections(&self) -> usize {
        self.inner.peers.lock().await.len()
    }

    async fn dispatch(&self, connection_id: u64, frame: &[u8]) -> Result<(), TransportError> {
        let message = match self.inner.codec.decode_outbound(frame) {
            Ok(message) => message,
            Err(e) => {
                debug!(connection_id, error = %e, "Hub dropping undecodable frame");
                return Ok(());
            }
        };
        trace!(connection_id, kind = message.kind(), "Hub received message");

        match message {
            OutboundMessage::Connect { .. } => {
                let reply = InboundMessage::OnConnect {
                    connection_id: Some(connection_id as i64),
                };
                self.reply(connection_id, &reply).await
            }
            OutboundMessage::Ping => {
                self.inner.pings.fetch_add(1, Ordering::Relaxed);
                self.reply(connection_id, &InboundMessage::Pong).await
            }
            OutboundMessage::Changes { payload } => {
                self.inner.changes_messages.fetch_add(1, Ordering::Relaxed);
                for record in payload {
                    self.broadcast(&InboundMessage::Add(record)).await?;
                }
                Ok(())
            }
        }
    }

    fn encode(&self, message: &InboundMessage) -> Result<Frame, TransportError> {
        self.inner
            .codec
            .encode_response(message, self.inner.compress)
            .map(Frame::Binary)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn reply(&self, connection_id: u64, message: &InboundMessage) -> Result<(), TransportError> {
        let frame = self.encode(message)?;
        let mut peers = self.inner.peers.lock().await;
        if let Some(outbox) = peers.get(&connection_id) {
            if outbox.send(frame).is_err() {
                peers.remove(&connection_id);
            }
        }
        Ok(())
    }

    async fn broadcast(&self, message: &InboundMessage) -> Result<(), TransportError> {
        let frame = self.encode(message)?;
        let mut peers = self.inner.peers.lock().await;
        let before = peers.len();
        // Peers whose receiver is gone are pruned
        peers.retain(|_, outbox| outbox.send(frame.clone()).is_ok());
        self.inner
            .notifications_sent
            .fetch_add(peers.len() as u64, Ordering::Relaxed);
        if peers.len() < before {
            trace!(pruned = before - peers.len(), "Hub pruned departed peers");
        }
        Ok(())
    }

    async fn unregister(&self, connection_id: u64) {
        self.inner.peers.lock().await.remove(&connection_id);
    }
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl Connector for LoopbackHub {
    async fn connect(&self, worker_id: WorkerId) -> Result<Connection, TransportError> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let connection_id = self.inner.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.peers.lock().await.insert(connection_id, outbox);
        trace!(worker_id = %worker_id, connection_id, "Hub accepted connection");

        Ok(Connection {
            status: self.inner.status,
            transport: Box::new(LoopbackTransport {
                hub: self.clone(),
                connection_id,
                inbox,
                closed: false,
            }),
        })
    }

    fn describe(&self) -> String {
        "loopback hub".to_string()
    }
}

/// One worker's connection to a [`LoopbackHub`]
pub struct LoopbackTransport {
    hub: LoopbackHub,
    connection_id: u64,
    inbox: mpsc::UnboundedReceiver<Frame>,
    closed: bool,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.hub.dispatch(self.connection_id, &frame).await
    }

    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        Ok(self.inbox.recv().await)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.hub.unregister(self.connection_id).await;
            self.inbox.close();
        }
        Ok(())
    }
}
