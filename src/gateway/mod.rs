//! Gateway session management.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | Per-connection state machine |
//! | [`heartbeat`] | Periodic keepalive task |
//! | [`connector`] | Reconnect supervisor and public entry point |

// ============================================================================
// Submodules
// ============================================================================

pub mod connector;
pub mod heartbeat;
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use connector::Connector;
pub use heartbeat::{Heartbeat, Sequence};
pub use session::{Session, SessionAction, SessionState};
