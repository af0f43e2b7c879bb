//! Gateway opcodes used by the connector.

// ============================================================================
// Imports
// ============================================================================

use serde::{Serialize, Serializer};

// ============================================================================
// Opcode
// ============================================================================

/// Gateway opcode.
///
/// Only the opcodes the connector sends or reacts to are listed; anything
/// else decodes to [`GatewayEvent::Unknown`](super::GatewayEvent::Unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// An event was dispatched.
    Dispatch,
    /// Keepalive, sent by the client or requested by the gateway.
    Heartbeat,
    /// Starts a new session.
    Identify,
    /// Joins, moves between, or leaves voice channels.
    VoiceStateUpdate,
    /// Sent immediately after connecting, carries the heartbeat interval.
    Hello,
    /// Acknowledges a received heartbeat.
    HeartbeatAck,
}

impl Opcode {
    /// Returns the numeric wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::VoiceStateUpdate => 4,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
        }
    }

    /// Looks up an opcode by its wire code.
    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            4 => Some(Self::VoiceStateUpdate),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup_is_consistent() {
        for op in [
            Opcode::Dispatch,
            Opcode::Heartbeat,
            Opcode::Identify,
            Opcode::VoiceStateUpdate,
            Opcode::Hello,
            Opcode::HeartbeatAck,
        ] {
            assert_eq!(Opcode::from_code(u64::from(op.code())), Some(op));
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(Opcode::from_code(3), None);
        assert_eq!(Opcode::from_code(7), None);
        assert_eq!(Opcode::from_code(999), None);
    }

    #[test]
    fn test_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Opcode::Hello).unwrap(), "10");
    }
}
