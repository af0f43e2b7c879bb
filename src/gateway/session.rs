//! Gateway session state machine.
//!
//! The [`Session`] interprets decoded frames for one connection and decides
//! what to send next. It performs no I/O: every transition returns a list of
//! [`SessionAction`]s that the [`Connector`](super::Connector) applies.
//!
//! # States
//!
//! ```text
//! Connecting ─open─► Authenticating ─READY─► AwaitingVoiceAck ─VOICE_STATE_UPDATE─► Joined
//!
//! any state ─close/error─► Closed
//! ```
//!
//! Hello and READY are independent: Hello starts the heartbeat in any open
//! state without changing it, and READY is accepted before or after Hello.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::protocol::{
    DispatchEvent, GatewayCommand, GatewayEvent, Identify, Ready, VoiceState, VoiceStateUpdate,
};

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of one gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Transport is being opened.
    Connecting,
    /// Identify sent, waiting for Hello or READY.
    Authenticating,
    /// Waiting for READY. Hello does not enter this state; the session
    /// stays in `Authenticating` until READY arrives.
    AwaitingReady,
    /// VoiceStateUpdate sent, waiting for the gateway to echo it.
    AwaitingVoiceAck,
    /// The account sits in the target voice channel.
    Joined,
    /// Connection closed or never opened.
    Closed,
}

impl SessionState {
    /// Returns `true` while the transport is open.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Connecting | Self::Closed)
    }

    /// Returns the state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::AwaitingReady => "awaiting_ready",
            Self::AwaitingVoiceAck => "awaiting_voice_ack",
            Self::Joined => "joined",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SessionAction
// ============================================================================

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send a command on the connection.
    Send(GatewayCommand),
    /// Start (or restart) the connection's heartbeat.
    StartHeartbeat(Duration),
    /// Send one heartbeat now.
    SendHeartbeat,
}

// ============================================================================
// Session
// ============================================================================

/// State machine for one gateway connection.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    identify: Identify,
    join: VoiceStateUpdate,
    ready: Option<Ready>,
}

impl Session {
    /// Creates a session in the `Connecting` state.
    ///
    /// `identify` is sent when the transport opens and `join` once READY
    /// arrives. The target channel is the one `join` names.
    #[must_use]
    pub fn new(identify: Identify, join: VoiceStateUpdate) -> Self {
        Self {
            state: SessionState::Connecting,
            identify,
            join,
            ready: None,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handles the transport opening.
    pub fn on_open(&mut self) -> Vec<SessionAction> {
        if self.state != SessionState::Connecting {
            debug!(state = %self.state, "Ignoring duplicate open notification");
            return Vec::new();
        }

        debug!("Sending Identify");
        self.state = SessionState::Authenticating;
        vec![SessionAction::Send(GatewayCommand::Identify(
            self.identify.clone(),
        ))]
    }

    /// Handles one decoded inbound frame.
    pub fn handle(&mut self, event: GatewayEvent) -> Vec<SessionAction> {
        match event {
            GatewayEvent::Hello { heartbeat_interval } => self.on_hello(heartbeat_interval),

            GatewayEvent::HeartbeatAck => {
                trace!("Heartbeat acknowledged");
                Vec::new()
            }

            GatewayEvent::HeartbeatRequest if self.state.is_open() => {
                debug!("Gateway requested a heartbeat");
                vec![SessionAction::SendHeartbeat]
            }

            GatewayEvent::Dispatch { event, .. } => self.on_dispatch(event),

            GatewayEvent::HeartbeatRequest | GatewayEvent::Unknown { .. } => {
                trace!(?event, state = %self.state, "Ignoring frame");
                Vec::new()
            }
        }
    }

    /// Marks the session closed.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    fn on_hello(&mut self, interval: Duration) -> Vec<SessionAction> {
        if !self.state.is_open() {
            debug!(state = %self.state, "Ignoring Hello outside an open connection");
            return Vec::new();
        }

        info!(
            interval_secs = interval.as_secs_f64(),
            "Received Hello"
        );
        vec![SessionAction::StartHeartbeat(interval)]
    }

    fn on_dispatch(&mut self, event: DispatchEvent) -> Vec<SessionAction> {
        match event {
            DispatchEvent::Ready(ready) => self.on_ready(ready),
            DispatchEvent::VoiceStateUpdate(voice) => {
                self.on_voice_state(&voice);
                Vec::new()
            }
            DispatchEvent::VoiceServerUpdate(server) => {
                debug!(endpoint = ?server.endpoint, "Voice server update");
                Vec::new()
            }
            DispatchEvent::Unknown(name) => {
                trace!(event = %name, "Ignoring dispatch");
                Vec::new()
            }
        }
    }

    fn on_ready(&mut self, ready: Ready) -> Vec<SessionAction> {
        if !matches!(
            self.state,
            SessionState::Authenticating | SessionState::AwaitingReady
        ) {
            debug!(state = %self.state, "Ignoring READY");
            return Vec::new();
        }

        info!(
            username = ready.username.as_deref().unwrap_or("unknown"),
            "Account ready, joining voice channel"
        );
        self.ready = Some(ready);
        self.state = SessionState::AwaitingVoiceAck;
        vec![SessionAction::Send(GatewayCommand::VoiceStateUpdate(
            self.join.clone(),
        ))]
    }

    fn on_voice_state(&mut self, voice: &VoiceState) {
        if voice.channel_id.as_ref() != Some(&self.join.channel_id) {
            trace!(channel_id = ?voice.channel_id, "Voice state for another channel");
            return;
        }

        // States of other users in the target channel share its channel id.
        let own_user = self.ready.as_ref().and_then(|ready| ready.user_id.as_ref());
        if let (Some(own), Some(user)) = (own_user, voice.user_id.as_ref())
            && own != user
        {
            trace!(user_id = %user, "Voice state for another user");
            return;
        }

        if self.state != SessionState::AwaitingVoiceAck {
            trace!(state = %self.state, "Voice state echo outside join");
            return;
        }

        self.state = SessionState::Joined;
        info!(
            guild_id = %self.join.guild_id,
            channel_id = %self.join.channel_id,
            "Joined voice channel"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
