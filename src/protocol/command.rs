//! Outbound gateway commands.
//!
//! # Format
//!
//! ```json
//! { "op": 2, "d": { "token": "...", "properties": { ... }, "presence": { ... } } }
//! { "op": 4, "d": { "guild_id": "...", "channel_id": "...", "self_mute": false, "self_deaf": true } }
//! { "op": 1, "d": 251 }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::identifiers::{ChannelId, GuildId};

use super::Opcode;

// ============================================================================
// GatewayCommand
// ============================================================================

/// A command sent from the connector to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// Authenticate a new session.
    Identify(Identify),
    /// Join a voice channel.
    VoiceStateUpdate(VoiceStateUpdate),
    /// Keepalive carrying the last dispatch sequence seen.
    Heartbeat {
        /// Last sequence number, `null` when none was received.
        sequence: Option<u64>,
    },
}

impl GatewayCommand {
    /// Returns the opcode this command is sent with.
    #[inline]
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Identify(_) => Opcode::Identify,
            Self::VoiceStateUpdate(_) => Opcode::VoiceStateUpdate,
            Self::Heartbeat { .. } => Opcode::Heartbeat,
        }
    }

    /// Returns a short name for logging.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identify(_) => "Identify",
            Self::VoiceStateUpdate(_) => "VoiceStateUpdate",
            Self::Heartbeat { .. } => "Heartbeat",
        }
    }

    /// Serializes the command into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for GatewayCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut frame = serializer.serialize_struct("GatewayCommand", 2)?;
        frame.serialize_field("op", &self.opcode())?;
        match self {
            Self::Identify(identify) => frame.serialize_field("d", identify)?,
            Self::VoiceStateUpdate(update) => frame.serialize_field("d", update)?,
            Self::Heartbeat { sequence } => frame.serialize_field("d", sequence)?,
        }
        frame.end()
    }
}

// ============================================================================
// Identify
// ============================================================================

/// Identify payload.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Identify {
    /// Account token.
    pub token: String,
    /// Client metadata.
    pub properties: ClientProperties,
    /// Initial presence.
    pub presence: Presence,
}

impl Identify {
    /// Creates an identify payload.
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>, properties: ClientProperties, presence: Presence) -> Self {
        Self {
            token: token.into(),
            properties,
            presence,
        }
    }
}

impl fmt::Debug for Identify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identify")
            .field("token", &"<redacted>")
            .field("properties", &self.properties)
            .field("presence", &self.presence)
            .finish()
    }
}

// ============================================================================
// ClientProperties
// ============================================================================

/// Client metadata reported in Identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProperties {
    /// Operating system.
    pub os: String,
    /// Browser name.
    pub browser: String,
    /// Device name.
    pub device: String,
}

impl Default for ClientProperties {
    fn default() -> Self {
        Self {
            os: "linux".to_string(),
            browser: "chrome".to_string(),
            device: "pc".to_string(),
        }
    }
}

// ============================================================================
// Presence
// ============================================================================

/// Presence reported in Identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Status string (`online`, `idle`, `dnd`, `invisible`).
    pub status: String,
    /// Whether the client is AFK.
    pub afk: bool,
}

impl Default for Presence {
    fn default() -> Self {
        Self {
            status: "online".to_string(),
            afk: false,
        }
    }
}

// ============================================================================
// VoiceStateUpdate
// ============================================================================

/// Voice state update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceStateUpdate {
    /// Guild containing the channel.
    pub guild_id: GuildId,
    /// Voice channel to join.
    pub channel_id: ChannelId,
    /// Whether the account mutes itself.
    pub self_mute: bool,
    /// Whether the account deafens itself.
    pub self_deaf: bool,
}

// ============================================================================
// Tests
// ============================================================================
