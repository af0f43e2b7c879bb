//! Error types for the voice connector.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use discord_voice_connector::{ConnectorConfig, Result};
//!
//! fn example() -> Result<()> {
//!     let config = ConnectorConfig::from_env()?;
//!     println!("joining {}", config.target().channel_id);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Outcome |
//! |----------|----------|---------|
//! | Configuration | [`Error::Config`] | Fatal, aborts before connecting |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::WebSocket`], [`Error::Io`] | Reconnect after delay |
//! | Protocol | [`Error::Protocol`], [`Error::Json`] | Frame discarded |
//! | Runtime | [`Error::Runtime`] | Logged, orderly stop |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a required value is missing, blank, or still a placeholder.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Gateway connection failed.
    ///
    /// Returned when the WebSocket connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while sending.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Frame could not be decoded or has an unexpected shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// Unexpected failure in the top-level control loop.
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a runtime error.
    #[inline]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_) | Self::Io(_)
        )
    }

    /// Returns `true` if this is a frame decoding error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Json(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Connection errors are recovered by reconnecting, protocol errors by
    /// discarding the frame.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_connection_error() || self.is_protocol_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("dns lookup failed");
        assert_eq!(err.to_string(), "Connection failed: dns lookup failed");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("DISCORD_TOKEN is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: DISCORD_TOKEN is not set"
        );
        assert!(err.is_config_error());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::protocol("test").is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::ConnectionClosed.is_recoverable());
        assert!(Error::protocol("missing field").is_recoverable());
        assert!(!Error::runtime("signal handler").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_protocol_error());
    }
}
