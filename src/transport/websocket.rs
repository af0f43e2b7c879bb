//! WebSocket transport over `tokio-tungstenite`.
//!
//! # Event Loop
//!
//! Each opened connection spawns a tokio task that handles:
//!
//! - Incoming text frames, forwarded as [`TransportEvent::Message`]
//! - Outgoing frames queued through [`Connection`]
//! - Close and error reporting, exactly once per connection

// ============================================================================
// Imports
// ============================================================================

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};

use super::connection::ConnectionCommand;
use super::{Connection, Transport, TransportEvent, TransportEvents};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the TCP + TLS + WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Close code sent when the client closes the connection.
const NORMAL_CLOSURE: u16 = 1000;

static INSTALL_CRYPTO_PROVIDER: Once = Once::new();

// ============================================================================
// Types
// ============================================================================

type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Production [`Transport`] connecting with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketTransport {
    /// Creates the transport and installs the process-wide TLS provider.
    #[must_use]
    pub fn new() -> Self {
        INSTALL_CRYPTO_PROVIDER.call_once(|| {
            // Err means another provider is already installed, which is fine.
            let _ = rustls::crypto::ring::default_provider().install_default();
        });

        Self {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Overrides the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: GatewayStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        events_tx: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let terminal = loop {
            tokio::select! {
                // Incoming frames from the gateway
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            let _ = events_tx.send(TransportEvent::Message(text.as_str().to_owned()));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_owned()))
                                .unwrap_or_default();
                            debug!(?code, %reason, "WebSocket closed by remote");
                            break TransportEvent::Close { code, reason };
                        }

                        Some(Err(e)) => {
                            debug!(error = %e, "WebSocket read failed");
                            break TransportEvent::Error(Error::WebSocket(e));
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break TransportEvent::Close {
                                code: None,
                                reason: "stream ended".to_string(),
                            };
                        }

                        // Ignore Binary, Ping, Pong, Frame
                        _ => {}
                    }
                }

                // Frames queued by the session and heartbeat
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                debug!(error = %e, "WebSocket write failed");
                                break TransportEvent::Error(Error::WebSocket(e));
                            }
                            trace!("Frame sent");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break TransportEvent::Close {
                                code: Some(NORMAL_CLOSURE),
                                reason: "closed by client".to_string(),
                            };
                        }

                        None => {
                            debug!("All connection handles dropped");
                            let _ = ws_write.close().await;
                            break TransportEvent::Close {
                                code: Some(NORMAL_CLOSURE),
                                reason: "connection released".to_string(),
                            };
                        }
                    }
                }
            }
        };

        let _ = events_tx.send(terminal);
        debug!("Event loop terminated");
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, endpoint: &Url) -> Result<(Connection, TransportEvents)> {
        let (ws_stream, response) = timeout(self.connect_timeout, connect_async(endpoint.as_str()))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "timed out after {:?} connecting to {endpoint}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| Error::connection(format!("WebSocket connect to {endpoint} failed: {e}")))?;

        info!(status = %response.status(), "WebSocket connection established");

        let (connection, command_rx) = Connection::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let _ = events_tx.send(TransportEvent::Open);

        tokio::spawn(Self::run_event_loop(ws_stream, command_rx, events_tx));

        Ok((connection, events_rx))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn bind_local() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/?v=9&encoding=json")).unwrap();
        (listener, url)
    }

    #[tokio::test]
    async fn test_exchanges_frames_with_server() {
        let (listener, url) = bind_local().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            ws.send(Message::Text(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#.into()))
                .await
                .unwrap();

            let reply = loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => break text.as_str().to_owned(),
                    Some(Ok(_)) => continue,
                    other => panic!("unexpected frame: {other:?}"),
                }
            };

            ws.close(None).await.unwrap();
            reply
        });

        let transport = WebSocketTransport::new();
        let (connection, mut events) = transport.open(&url).await.expect("open should succeed");

        assert!(matches!(events.recv().await, Some(TransportEvent::Open)));
        match events.recv().await {
            Some(TransportEvent::Message(text)) => assert!(text.contains("heartbeat_interval")),
            other => panic!("expected message, got {other:?}"),
        }

        connection.send_text(r#"{"op":1,"d":null}"#).unwrap();
        assert_eq!(server.await.unwrap(), r#"{"op":1,"d":null}"#);

        loop {
            match events.recv().await {
                Some(TransportEvent::Close { .. }) | Some(TransportEvent::Error(_)) => break,
                Some(TransportEvent::Message(_)) | Some(TransportEvent::Open) => continue,
                None => panic!("event stream ended without a terminal event"),
            }
        }
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_reports_close() {
        let (listener, url) = bind_local().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (connection, mut events) = WebSocketTransport::new().open(&url).await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Open)));

        connection.shutdown();
        match events.recv().await {
            Some(TransportEvent::Close { code, .. }) => assert_eq!(code, Some(NORMAL_CLOSURE)),
            other => panic!("expected close, got {other:?}"),
        }
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, url) = bind_local().await;
        drop(listener);

        let result = WebSocketTransport::new().open(&url).await;
        let err = result.err().expect("connect should fail");
        assert!(matches!(err, Error::Connection { .. }));
    }
}
