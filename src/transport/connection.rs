//! Connection handle.
//!
//! A [`Connection`] is the sending half of one live transport. Clones share
//! the same underlying socket. When every strong handle is dropped the
//! transport closes its socket, so a [`WeakConnection`] can be held by
//! background tasks without extending the connection's lifetime.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::GatewayCommand;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Commands consumed by a transport's event loop.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ConnectionCommand {
    /// Send a text frame.
    Send(String),
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one live transport.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone. All operations are
/// non-blocking: frames are queued to the transport's event loop.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Creates a connection and the receiver its transport consumes.
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<ConnectionCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (Self { command_tx }, command_rx)
    }

    /// Serializes and queues a gateway command.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the command cannot be serialized
    /// - [`Error::ConnectionClosed`] if the transport has shut down
    pub fn send(&self, command: &GatewayCommand) -> Result<()> {
        let json = command.to_json()?;
        self.send_text(json)?;
        trace!(command = command.name(), "Command queued");
        Ok(())
    }

    /// Queues a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the transport has shut down.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(text.into()))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Asks the transport to close the connection.
    ///
    /// Safe to call more than once and after the transport has gone.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Returns `true` if the transport no longer accepts frames.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Creates a handle that does not keep the connection alive.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            command_tx: self.command_tx.downgrade(),
        }
    }
}

// ============================================================================
// WeakConnection
// ============================================================================

/// Non-owning handle to a [`Connection`].
#[derive(Debug, Clone)]
pub struct WeakConnection {
    command_tx: mpsc::WeakUnboundedSender<ConnectionCommand>,
}

impl WeakConnection {
    /// Returns the connection if any strong handle is still alive.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Connection> {
        self.command_tx
            .upgrade()
            .map(|command_tx| Connection { command_tx })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_queues_json() {
        let (connection, mut rx) = Connection::channel();
        connection
            .send(&GatewayCommand::Heartbeat { sequence: Some(3) })
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionCommand::Send(r#"{"op":1,"d":3}"#.to_string())
        );
    }

    #[test]
    fn test_send_after_transport_gone() {
        let (connection, rx) = Connection::channel();
        drop(rx);

        assert!(connection.is_closed());
        let err = connection.send_text("{}").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        // shutdown never fails
        connection.shutdown();
        connection.shutdown();
    }

    #[test]
    fn test_weak_does_not_keep_alive() {
        let (connection, _rx) = Connection::channel();
        let weak = connection.downgrade();
        assert!(weak.upgrade().is_some());

        let clone = connection.clone();
        drop(connection);
        assert!(weak.upgrade().is_some());

        drop(clone);
        assert!(weak.upgrade().is_none());
    }
}
