//! Discord voice connector - keeps an account parked in a voice channel.
//!
//! This library maintains one persistent connection to the Discord gateway,
//! identifies as a user account, keeps the connection alive with heartbeats,
//! and joins a configured voice channel. Dropped connections are retried
//! after a fixed delay until the connector is stopped.
//!
//! # Architecture
//!
//! Each connection attempt builds a fresh triple:
//!
//! - **Transport**: WebSocket I/O task, frames in and out
//! - **Session**: state machine turning inbound frames into outbound commands
//! - **Heartbeat**: timer task sending keepalives at the Hello interval
//!
//! The [`Connector`] supervises these and owns the running flag. Inbound
//! frames are decoded once into [`GatewayEvent`]; unknown opcodes and events
//! are ignored rather than treated as errors.
//!
//! # Quick Start
//!
//! ```no_run
//! use discord_voice_connector::{Connector, ConnectorConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ConnectorConfig::builder()
//!         .token("MTA4...")
//!         .guild_id("112233445566778899")
//!         .channel_id("998877665544332211")
//!         .build()?;
//!
//!     let connector = Connector::new(config);
//!     connector.start();
//!
//!     tokio::signal::ctrl_c().await?;
//!     connector.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Configuration builder and environment loading |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`gateway`] | [`Connector`], session state machine, heartbeat |
//! | [`identifiers`] | Type-safe snowflake wrappers |
//! | [`logging`] | Console and file log sinks |
//! | [`protocol`] | Gateway frame types |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Connector configuration.
///
/// Use [`ConnectorConfig::builder()`] or [`ConnectorConfig::from_env()`].
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Gateway session management.
pub mod gateway;

/// Type-safe identifiers for gateway entities.
///
/// Newtype wrappers prevent mixing guild, channel and user ids.
pub mod identifiers;

/// Logging setup for the binary.
pub mod logging;

/// Gateway protocol frame types.
pub mod protocol;

/// Transport layer.
///
/// Defines the [`Transport`](transport::Transport) seam and its WebSocket
/// implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{ConnectorConfig, ConnectorConfigBuilder, SessionConfig, Token, VoiceTarget};

// Error types
pub use error::{Error, Result};

// Gateway types
pub use gateway::{Connector, SessionState};

// Identifier types
pub use identifiers::{ChannelId, GuildId, UserId};

// Protocol types
pub use protocol::{GatewayCommand, GatewayEvent};

// Transport types
pub use transport::{Transport, WebSocketTransport};
