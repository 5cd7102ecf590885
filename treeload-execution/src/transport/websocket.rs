//! WebSocket transport backed by tokio-tungstenite

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use treeload_config::TargetConfig;
use treeload_core::WorkerId;

use super::{Connection, Connector, Frame, Transport};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

static CRYPTO_PROVIDER: Once = Once::new();

/// wss targets need a process-wide rustls provider
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::ring::default_provider().install_default().is_err() {
            trace!("rustls crypto provider already installed");
        }
    });
}

/// Opens one websocket per worker against the configured endpoint
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    headers: Vec<(String, String)>,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, headers: Vec<(String, String)>, connect_timeout: Duration) -> Self {
        install_crypto_provider();
        Self {
            url: url.into(),
            headers,
            connect_timeout,
        }
    }

    pub fn from_config(target: &TargetConfig) -> Self {
        Self::new(target.url(), target.request_headers(), target.connect_timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, worker_id: WorkerId) -> Result<Connection, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(format!("Failed to build WebSocket request: {}", e)))?;

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Connect(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Connect(format!("Invalid header value: {}", e)))?;
            request.headers_mut().insert(name, value);
        }

        debug!(worker_id = %worker_id, url = %self.url, "Opening WebSocket");

        match tokio::time::timeout(self.connect_timeout, connect_async(request)).await {
            Ok(Ok((stream, response))) => Ok(Connection {
                status: response.status().as_u16(),
                transport: Box::new(WebSocketTransport::new(stream)),
            }),
            Ok(Err(tokio_tungstenite::tungstenite::Error::Http(response))) => {
                Err(TransportError::Rejected(response.status().as_u16()))
            }
            Ok(Err(e)) => Err(TransportError::Connect(e.to_string())),
            Err(_) => Err(TransportError::Timeout(self.connect_timeout)),
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// One open websocket
pub struct WebSocketTransport {
    stream: WsStream,
}

impl WebSocketTransport {
    pub fn new(stream: WsStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.stream
            .send(Message::Binary(Bytes::from(frame)))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(Frame::Binary(data.to_vec()))),
                Some(Ok(Message::Text(text))) => return Ok(Some(Frame::Text(text.as_str().to_owned()))),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Server closed connection");
                    return Ok(None);
                }
                // Ping/Pong are answered by tungstenite itself
                Some(Ok(other)) => trace!(?other, "Ignoring control frame"),
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_from_config() {
        let mut target = TargetConfig::default();
        target.tags.insert("my_tag".to_string(), "hello".to_string());
        let connector = WebSocketConnector::from_config(&target);

        assert_eq!(connector.url(), "ws://localhost:8001/documents");
        assert_eq!(
            connector.headers,
            vec![("x-tag-my_tag".to_string(), "hello".to_string())]
        );
        assert_eq!(connector.describe(), "ws://localhost:8001/documents");
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = WebSocketConnector::new(
            format!("ws://127.0.0.1:{}/documents", port),
            Vec::new(),
            Duration::from_secs(2),
        );
        let result = connector.connect(WorkerId::new(1).unwrap()).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_secure_target_attempts_tls() {
        // Accepts TCP and hangs up, so the TLS handshake cannot finish
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        });

        let target = TargetConfig {
            host: "127.0.0.1".to_string(),
            port,
            secure: true,
            ..Default::default()
        };
        let connector = WebSocketConnector::from_config(&target);
        assert!(connector.url().starts_with("wss://"));

        match connector.connect(WorkerId::new(1).unwrap()).await {
            Err(TransportError::Connect(reason)) => {
                assert!(!reason.contains("not compiled"), "{reason}");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
