//! Gateway wire protocol.
//!
//! Every frame exchanged with the gateway is a JSON object with an `op`
//! code and a `d` payload. Dispatch frames also carry an event name `t`
//! and a sequence number `s`.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Opcode |
//! |-------|-----------|--------|
//! | `Identify` | Local → Gateway | 2 |
//! | `VoiceStateUpdate` | Local → Gateway | 4 |
//! | `Heartbeat` | Both | 1 |
//! | `Hello` | Gateway → Local | 10 |
//! | `HeartbeatAck` | Gateway → Local | 11 |
//! | Dispatch (`READY`, `VOICE_STATE_UPDATE`, ...) | Gateway → Local | 0 |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound commands |
//! | `event` | Inbound frame decoding |
//! | `opcode` | Opcode table |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound gateway commands.
pub mod command;

/// Inbound gateway events.
pub mod event;

/// Gateway opcodes.
pub mod opcode;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{ClientProperties, GatewayCommand, Identify, Presence, VoiceStateUpdate};
pub use event::{DispatchEvent, GatewayEvent, Ready, VoiceServer, VoiceState};
pub use opcode::Opcode;
