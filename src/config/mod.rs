//! Connector configuration.
//!
//! Configuration is created once at startup and never mutated. It is built
//! with [`ConnectorConfig::builder()`] or loaded from the environment with
//! [`ConnectorConfig::from_env()`]; both reject missing and placeholder
//! values with [`Error::Config`](crate::Error::Config).
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectorConfig`] | Complete validated configuration |
//! | [`ConnectorConfigBuilder`] | Fluent configuration builder |
//! | [`Token`] | Account credential with redacted `Debug` |
//! | [`VoiceTarget`] | Guild and voice channel to join |
//! | [`SessionConfig`] | Mute/deafen flags, presence and client properties |
//!
//! # Example
//!
//! ```no_run
//! use discord_voice_connector::ConnectorConfig;
//!
//! # fn example() -> discord_voice_connector::Result<()> {
//! let config = ConnectorConfig::builder()
//!     .token("MTA4...")
//!     .guild_id("112233445566778899")
//!     .channel_id("998877665544332211")
//!     .self_deaf(true)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, GuildId};
use crate::protocol::{ClientProperties, Identify, Presence, VoiceStateUpdate};

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder with validation.
pub mod builder;

/// Environment variable loading.
pub mod env;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectorConfigBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Gateway base URL.
pub const GATEWAY_BASE_URL: &str = "wss://gateway.discord.gg/";

/// Gateway protocol version.
pub const GATEWAY_VERSION: u8 = 9;

/// Gateway payload encoding.
pub const GATEWAY_ENCODING: &str = "json";

/// Fixed delay between a dropped connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(15);

/// Upper bound on how long `stop()` waits for background tasks.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default log file, appended to across runs.
pub const DEFAULT_LOG_FILE: &str = "voice_connector.log";

// ============================================================================
// Token
// ============================================================================

/// Account credential.
///
/// `Debug` never prints the token; use [`Token::tag`] to identify the
/// account in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wraps a token string.
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token.
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns a short account tag: the last six characters of the token,
    /// or the whole token when it has six characters or fewer.
    #[must_use]
    pub fn tag(&self) -> String {
        let count = self.0.chars().count();
        let tail: String = self.0.chars().skip(count.saturating_sub(6)).collect();
        format!("...{tail}")
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.tag())
    }
}

// ============================================================================
// VoiceTarget
// ============================================================================

/// Guild and voice channel to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTarget {
    /// Guild containing the channel.
    pub guild_id: GuildId,
    /// Voice channel to join.
    pub channel_id: ChannelId,
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Per-session flags sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Mute the account's microphone.
    pub self_mute: bool,
    /// Deafen the account.
    pub self_deaf: bool,
    /// Presence sent with Identify.
    pub presence: Presence,
    /// Client metadata sent with Identify.
    pub properties: ClientProperties,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            self_mute: false,
            self_deaf: true,
            presence: Presence::default(),
            properties: ClientProperties::default(),
        }
    }
}

// ============================================================================
// ConnectorConfig
// ============================================================================

/// Validated connector configuration.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub(crate) token: Token,
    pub(crate) target: VoiceTarget,
    pub(crate) session: SessionConfig,
    pub(crate) endpoint: Url,
    pub(crate) reconnect_delay: Duration,
    pub(crate) stop_timeout: Duration,
    pub(crate) log_file: PathBuf,
}

impl ConnectorConfig {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::new()
    }

    /// Returns the account credential.
    #[inline]
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Returns the voice channel to join.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &VoiceTarget {
        &self.target
    }

    /// Returns the session flags.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Returns the gateway endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the fixed reconnect delay.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Returns how long `stop()` waits for background tasks.
    #[inline]
    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Returns the log file path.
    #[inline]
    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Builds the Identify payload for a new session.
    #[must_use]
    pub fn identify(&self) -> Identify {
        Identify::new(
            self.token.expose(),
            self.session.properties.clone(),
            self.session.presence.clone(),
        )
    }

    /// Builds the VoiceStateUpdate payload that joins the target channel.
    #[must_use]
    pub fn voice_state_update(&self) -> VoiceStateUpdate {
        VoiceStateUpdate {
            guild_id: self.target.guild_id.clone(),
            channel_id: self.target.channel_id.clone(),
            self_mute: self.session.self_mute,
            self_deaf: self.session.self_deaf,
        }
    }
}

/// Returns the default gateway endpoint with version and encoding parameters.
///
/// # Errors
///
/// Returns [`Error::Config`] if the base URL does not parse.
pub fn default_endpoint() -> Result<Url> {
    let mut url = Url::parse(GATEWAY_BASE_URL)
        .map_err(|e| Error::config(format!("invalid gateway URL {GATEWAY_BASE_URL}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("v", &GATEWAY_VERSION.to_string())
        .append_pair("encoding", GATEWAY_ENCODING);
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
