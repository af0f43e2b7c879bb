//! Inbound gateway events.
//!
//! Text frames are decoded once, at the transport boundary, into the closed
//! [`GatewayEvent`] enum. Opcodes and event names the connector does not
//! handle become explicit `Unknown` variants instead of errors.
//!
//! # Format
//!
//! ```json
//! { "op": 10, "d": { "heartbeat_interval": 41250 } }
//! { "op": 0, "t": "VOICE_STATE_UPDATE", "s": 3, "d": { "channel_id": "...", ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, GuildId, UserId};

use super::Opcode;

// ============================================================================
// Raw Frame
// ============================================================================

/// Undecoded frame envelope.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    op: Option<u64>,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// Hello body. The interval is milliseconds and may be sent as a float.
#[derive(Debug, Deserialize)]
struct HelloPayload {
    heartbeat_interval: f64,
}

impl HelloPayload {
    fn interval(&self) -> Result<Duration> {
        let millis = self.heartbeat_interval;
        if !millis.is_finite() || millis <= 0.0 {
            return Err(Error::protocol(format!(
                "Hello heartbeat_interval must be positive, got {millis}"
            )));
        }
        let interval = Duration::try_from_secs_f64(millis / 1000.0)
            .map_err(|e| Error::protocol(format!("Hello heartbeat_interval out of range: {e}")))?;
        if interval.is_zero() {
            return Err(Error::protocol("Hello heartbeat_interval rounds to zero"));
        }
        Ok(interval)
    }
}

// ============================================================================
// GatewayEvent
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// First frame on a connection.
    Hello {
        /// Interval between heartbeats.
        heartbeat_interval: Duration,
    },

    /// The gateway acknowledged a heartbeat.
    HeartbeatAck,

    /// The gateway asks for an immediate heartbeat.
    HeartbeatRequest,

    /// A named event.
    Dispatch {
        /// Sequence number of this dispatch, if present.
        sequence: Option<u64>,
        /// The event itself.
        event: DispatchEvent,
    },

    /// An opcode the connector does not handle.
    Unknown {
        /// Raw opcode, `None` if the frame carried none.
        op: Option<u64>,
    },
}

impl GatewayEvent {
    /// Decodes a text frame.
    ///
    /// Frames are classified the same way the gateway documents them:
    /// `op` 10 is Hello, any frame carrying `t` is a dispatch, `op` 11 is a
    /// heartbeat ack and `op` 1 a heartbeat request.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not a JSON object
    /// - [`Error::Protocol`] if a known frame is missing a required field
    pub fn decode(text: &str) -> Result<Self> {
        let frame: RawFrame = serde_json::from_str(text)?;
        let opcode = frame.op.and_then(Opcode::from_code);

        if opcode == Some(Opcode::Hello) {
            let hello: HelloPayload = serde_json::from_value(frame.d)
                .map_err(|e| Error::protocol(format!("invalid Hello payload: {e}")))?;
            return Ok(Self::Hello {
                heartbeat_interval: hello.interval()?,
            });
        }

        if let Some(name) = frame.t {
            let event = DispatchEvent::decode(name, frame.d)?;
            return Ok(Self::Dispatch {
                sequence: frame.s,
                event,
            });
        }

        Ok(match opcode {
            Some(Opcode::HeartbeatAck) => Self::HeartbeatAck,
            Some(Opcode::Heartbeat) => Self::HeartbeatRequest,
            _ => Self::Unknown { op: frame.op },
        })
    }

    /// Returns the dispatch sequence number carried by this frame.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Self::Dispatch { sequence, .. } => *sequence,
            _ => None,
        }
    }
}

// ============================================================================
// DispatchEvent
// ============================================================================

/// Dispatch events recognized by the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// `READY`: the identify handshake succeeded.
    Ready(Ready),
    /// `VOICE_STATE_UPDATE`: someone's voice state changed.
    VoiceStateUpdate(VoiceState),
    /// `VOICE_SERVER_UPDATE`: voice server assignment.
    VoiceServerUpdate(VoiceServer),
    /// Any other event name.
    Unknown(String),
}

impl DispatchEvent {
    fn decode(name: String, payload: Value) -> Result<Self> {
        match name.as_str() {
            "READY" => Ok(Self::Ready(Ready::from_payload(&payload))),
            "VOICE_STATE_UPDATE" => serde_json::from_value(payload)
                .map(Self::VoiceStateUpdate)
                .map_err(|e| Error::protocol(format!("invalid VOICE_STATE_UPDATE payload: {e}"))),
            "VOICE_SERVER_UPDATE" => serde_json::from_value(payload)
                .map(Self::VoiceServerUpdate)
                .map_err(|e| Error::protocol(format!("invalid VOICE_SERVER_UPDATE payload: {e}"))),
            _ => Ok(Self::Unknown(name)),
        }
    }

    /// Returns the wire event name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(_) => "READY",
            Self::VoiceStateUpdate(_) => "VOICE_STATE_UPDATE",
            Self::VoiceServerUpdate(_) => "VOICE_SERVER_UPDATE",
            Self::Unknown(name) => name,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Fields of `READY` the connector logs.
///
/// The payload is large and only informational here, so it is read
/// leniently: a missing or odd payload still counts as Ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ready {
    /// Gateway session id.
    pub session_id: Option<String>,
    /// Id of the identified account.
    pub user_id: Option<UserId>,
    /// Username of the identified account.
    pub username: Option<String>,
}

impl Ready {
    fn from_payload(payload: &Value) -> Self {
        let text = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_string);
        Self {
            session_id: text(payload.get("session_id")),
            user_id: text(payload.get("user").and_then(|user| user.get("id"))).map(UserId::new),
            username: text(payload.get("user").and_then(|user| user.get("username"))),
        }
    }
}

/// Voice state of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoiceState {
    /// Guild of the voice channel.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Channel joined, `None` when the user left voice.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    /// User the state belongs to.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Gateway session id of that user.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Self-mute flag.
    #[serde(default)]
    pub self_mute: bool,
    /// Self-deafen flag.
    #[serde(default)]
    pub self_deaf: bool,
}

/// Voice server assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoiceServer {
    /// Guild the server belongs to.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Voice server host.
    #[serde(default)]
    pub endpoint: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hello() {
        let event = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#).unwrap();
        assert_eq!(
            event,
            GatewayEvent::Hello {
                heartbeat_interval: Duration::from_millis(41250)
            }
        );
    }

    #[test]
    fn test_decode_hello_missing_interval() {
        let err = GatewayEvent::decode(r#"{"op":10,"d":{}}"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_decode_hello_zero_interval() {
        let err = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":0}}"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_decode_hello_float_interval() {
        let event = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":41250.0}}"#).unwrap();
        assert_eq!(
            event,
            GatewayEvent::Hello {
                heartbeat_interval: Duration::from_millis(41250)
            }
        );
    }

    #[test]
    fn test_decode_hello_negative_interval() {
        let err = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":-5.5}}"#).unwrap_err();
        assert!(err.is_protocol_error());

        let err = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":1e400}}"#).unwrap_err();
        assert!(err.is_protocol_error());

        let err = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":1e-12}}"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_decode_ready_without_op_or_payload() {
        let event = GatewayEvent::decode(r#"{"t":"READY"}"#).unwrap();
        assert_eq!(
            event,
            GatewayEvent::Dispatch {
                sequence: None,
                event: DispatchEvent::Ready(Ready::default()),
            }
        );
    }

    #[test]
    fn test_decode_ready_fields() {
        let text = r#"{"op":0,"s":1,"t":"READY","d":{"session_id":"abc","user":{"id":"7","username":"bob"}}}"#;
        let event = GatewayEvent::decode(text).unwrap();

        assert_eq!(event.sequence(), Some(1));
        let GatewayEvent::Dispatch {
            event: DispatchEvent::Ready(ready),
            ..
        } = event
        else {
            panic!("expected READY dispatch");
        };
        assert_eq!(ready.session_id.as_deref(), Some("abc"));
        assert_eq!(ready.username.as_deref(), Some("bob"));
        assert_eq!(ready.user_id, Some(UserId::new("7")));
    }

    #[test]
    fn test_decode_voice_state_update() {
        let text = r#"{"op":0,"s":4,"t":"VOICE_STATE_UPDATE","d":{"guild_id":"1","channel_id":"2","user_id":"3","self_deaf":true}}"#;
        let event = GatewayEvent::decode(text).unwrap();

        let GatewayEvent::Dispatch {
            sequence,
            event: DispatchEvent::VoiceStateUpdate(state),
        } = event
        else {
            panic!("expected VOICE_STATE_UPDATE dispatch");
        };
        assert_eq!(sequence, Some(4));
        assert_eq!(state.channel_id, Some(ChannelId::new("2")));
        assert_eq!(state.guild_id, Some(GuildId::new("1")));
        assert!(state.self_deaf);
        assert!(!state.self_mute);
    }

    #[test]
    fn test_decode_voice_state_update_left_channel() {
        let text = r#"{"t":"VOICE_STATE_UPDATE","d":{"channel_id":null}}"#;
        let event = GatewayEvent::decode(text).unwrap();
        assert!(matches!(
            event,
            GatewayEvent::Dispatch {
                event: DispatchEvent::VoiceStateUpdate(VoiceState { channel_id: None, .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_decode_voice_state_update_without_payload() {
        let err = GatewayEvent::decode(r#"{"t":"VOICE_STATE_UPDATE"}"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_decode_voice_server_update() {
        let text = r#"{"t":"VOICE_SERVER_UPDATE","d":{"guild_id":"1","endpoint":"eu.discord.media:443","token":"x"}}"#;
        let event = GatewayEvent::decode(text).unwrap();
        assert!(matches!(
            event,
            GatewayEvent::Dispatch {
                event: DispatchEvent::VoiceServerUpdate(_),
                ..
            }
        ));
    }

    #[test]
    fn test_decode_heartbeat_frames() {
        assert_eq!(
            GatewayEvent::decode(r#"{"op":11}"#).unwrap(),
            GatewayEvent::HeartbeatAck
        );
        assert_eq!(
            GatewayEvent::decode(r#"{"op":1,"d":null}"#).unwrap(),
            GatewayEvent::HeartbeatRequest
        );
    }

    #[test]
    fn test_decode_unknown() {
        assert_eq!(
            GatewayEvent::decode(r#"{"op":7,"d":null}"#).unwrap(),
            GatewayEvent::Unknown { op: Some(7) }
        );
        assert_eq!(
            GatewayEvent::decode(r#"{}"#).unwrap(),
            GatewayEvent::Unknown { op: None }
        );

        let event = GatewayEvent::decode(r#"{"op":0,"t":"GUILD_CREATE","d":{}}"#).unwrap();
        let GatewayEvent::Dispatch { event, .. } = event else {
            panic!("expected dispatch");
        };
        assert_eq!(event, DispatchEvent::Unknown("GUILD_CREATE".to_string()));
        assert_eq!(event.name(), "GUILD_CREATE");
    }

    #[test]
    fn test_decode_malformed() {
        assert!(GatewayEvent::decode("not json").unwrap_err().is_protocol_error());
        assert!(GatewayEvent::decode("42").unwrap_err().is_protocol_error());
        assert!(GatewayEvent::decode(r#"{"op":"ten"}"#).unwrap_err().is_protocol_error());
    }
}
