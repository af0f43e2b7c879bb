//! WebSocket transport layer.
//!
//! A thin duplex channel to the gateway. It carries text frames and reports
//! the connection lifecycle; it never retries. Reconnecting is the job of
//! the [`Connector`](crate::Connector).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   commands    ┌────────────────┐    WebSocket    ┌──────────┐
//! │ Session /       │──────────────►│  event loop    │◄───────────────►│ Gateway  │
//! │ Heartbeat       │◄──────────────│  (tokio task)  │   wss://...     │          │
//! └─────────────────┘ TransportEvent└────────────────┘                 └──────────┘
//! ```
//!
//! # Event Stream
//!
//! Every opened transport yields [`TransportEvent::Open`] first, then any
//! number of [`TransportEvent::Message`]s, then exactly one terminal
//! [`TransportEvent::Close`] or [`TransportEvent::Error`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Cloneable send handle and its weak form |
//! | `websocket` | `tokio-tungstenite` implementation |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// Connection handle.
pub mod connection;

/// WebSocket transport over `tokio-tungstenite`.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, WeakConnection};
pub use websocket::WebSocketTransport;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle and data notifications from an open transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is open and ready for frames.
    Open,

    /// A text frame arrived.
    Message(String),

    /// The connection closed.
    Close {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },

    /// The connection failed.
    Error(Error),
}

/// Receiving side of a transport's event stream.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

// ============================================================================
// Transport
// ============================================================================

/// Opens duplex connections to the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a new connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the connection cannot be established.
    async fn open(&self, endpoint: &Url) -> Result<(Connection, TransportEvents)>;
}
