//! Builder pattern for connector configuration.
//!
//! Provides a fluent API for assembling a [`ConnectorConfig`]. Validation
//! happens once, in [`ConnectorConfigBuilder::build`].

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, GuildId};
use crate::protocol::{ClientProperties, Presence};

use super::{
    ConnectorConfig, DEFAULT_LOG_FILE, DEFAULT_RECONNECT_DELAY, DEFAULT_STOP_TIMEOUT,
    SessionConfig, Token, VoiceTarget, default_endpoint,
};

// ============================================================================
// Constants
// ============================================================================

/// Placeholder left in the token slot of an unedited configuration.
pub const TOKEN_PLACEHOLDER: &str = "YOUR_DISCORD_TOKEN_HERE";

/// Placeholder left in the guild slot of an unedited configuration.
pub const GUILD_PLACEHOLDER: &str = "YOUR_GUILD_ID_HERE";

/// Placeholder left in the channel slot of an unedited configuration.
pub const CHANNEL_PLACEHOLDER: &str = "YOUR_VOICE_CHANNEL_ID_HERE";

const PLACEHOLDERS: [&str; 3] = [TOKEN_PLACEHOLDER, GUILD_PLACEHOLDER, CHANNEL_PLACEHOLDER];

// ============================================================================
// ConnectorConfigBuilder
// ============================================================================

/// Builder for configuring a [`ConnectorConfig`].
///
/// Use [`ConnectorConfig::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ConnectorConfigBuilder {
    token: Option<String>,
    guild_id: Option<String>,
    channel_id: Option<String>,
    session: SessionConfig,
    endpoint: Option<String>,
    reconnect_delay: Duration,
    stop_timeout: Duration,
    log_file: PathBuf,
}

impl Default for ConnectorConfigBuilder {
    fn default() -> Self {
        Self {
            token: None,
            guild_id: None,
            channel_id: None,
            session: SessionConfig::default(),
            endpoint: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

// ============================================================================
// ConnectorConfigBuilder Implementation
// ============================================================================

impl ConnectorConfigBuilder {
    /// Creates a builder with default session flags and no identifiers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the account token.
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the guild containing the voice channel.
    #[inline]
    #[must_use]
    pub fn guild_id(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Sets the voice channel to join.
    #[inline]
    #[must_use]
    pub fn channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    /// Sets the self-mute flag.
    #[inline]
    #[must_use]
    pub fn self_mute(mut self, self_mute: bool) -> Self {
        self.session.self_mute = self_mute;
        self
    }

    /// Sets the self-deafen flag.
    #[inline]
    #[must_use]
    pub fn self_deaf(mut self, self_deaf: bool) -> Self {
        self.session.self_deaf = self_deaf;
        self
    }

    /// Sets the presence sent with Identify.
    #[inline]
    #[must_use]
    pub fn presence(mut self, presence: Presence) -> Self {
        self.session.presence = presence;
        self
    }

    /// Sets the client properties sent with Identify.
    #[inline]
    #[must_use]
    pub fn properties(mut self, properties: ClientProperties) -> Self {
        self.session.properties = properties;
        self
    }

    /// Overrides the gateway endpoint.
    ///
    /// Must be a `ws://` or `wss://` URL.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the fixed delay before reconnecting.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Overrides how long `stop()` waits for background tasks.
    #[inline]
    #[must_use]
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Sets the log file path.
    #[inline]
    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the token, guild or channel is missing, blank,
    ///   or still a placeholder
    /// - [`Error::Config`] if the endpoint is not a WebSocket URL
    pub fn build(self) -> Result<ConnectorConfig> {
        let token = required("token", self.token.as_deref(), ".token()")?;
        let guild_id = required("guild id", self.guild_id.as_deref(), ".guild_id()")?;
        let channel_id = required("channel id", self.channel_id.as_deref(), ".channel_id()")?;
        let endpoint = self.validate_endpoint()?;

        Ok(ConnectorConfig {
            token: Token::new(token),
            target: VoiceTarget {
                guild_id: GuildId::new(guild_id),
                channel_id: ChannelId::new(channel_id),
            },
            session: self.session,
            endpoint,
            reconnect_delay: self.reconnect_delay,
            stop_timeout: self.stop_timeout,
            log_file: self.log_file,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectorConfigBuilder {
    /// Validates the endpoint override, falling back to the default gateway.
    fn validate_endpoint(&self) -> Result<Url> {
        let Some(raw) = self.endpoint.as_deref() else {
            return default_endpoint();
        };

        let url = Url::parse(raw.trim())
            .map_err(|e| Error::config(format!("Invalid gateway endpoint {raw:?}: {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Gateway endpoint must use ws:// or wss://, got {scheme}://"
            ))),
        }
    }
}

/// Returns `true` for blank values and unedited placeholders.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || PLACEHOLDERS.contains(&value)
}

fn required(name: &str, value: Option<&str>, setter: &str) -> Result<String> {
    match value {
        Some(value) if !is_placeholder(value) => Ok(value.trim().to_string()),
        Some(_) => Err(Error::config(format!(
            "The {name} is still a placeholder. Fill in the real value before starting."
        ))),
        None => Err(Error::config(format!(
            "The {name} is required. Use {setter} to set it."
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::GatewayCommand;

    fn complete() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::new()
            .token("MTA4NjQ.GxYz12.abcdefghijklmnop")
            .guild_id("112233445566778899")
            .channel_id("998877665544332211")
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ConnectorConfigBuilder::new();
        assert!(builder.token.is_none());
        assert!(builder.guild_id.is_none());
        assert!(builder.channel_id.is_none());
        assert_eq!(builder.reconnect_delay, DEFAULT_RECONNECT_DELAY);
    }

    #[test]
    fn test_build_complete() {
        let config = complete().self_mute(true).self_deaf(false).build().unwrap();

        assert_eq!(config.token().expose(), "MTA4NjQ.GxYz12.abcdefghijklmnop");
        assert_eq!(config.target().guild_id.as_str(), "112233445566778899");
        assert_eq!(config.target().channel_id.as_str(), "998877665544332211");
        assert!(config.session().self_mute);
        assert!(!config.session().self_deaf);
        assert_eq!(
            config.endpoint().as_str(),
            "wss://gateway.discord.gg/?v=9&encoding=json"
        );
        assert_eq!(config.reconnect_delay(), Duration::from_secs(15));
        assert_eq!(config.stop_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_build_fails_without_token() {
        let err = ConnectorConfigBuilder::new()
            .guild_id("1")
            .channel_id("2")
            .build()
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_build_fails_with_placeholders() {
        let cases = [
            complete().token(TOKEN_PLACEHOLDER),
            complete().guild_id(GUILD_PLACEHOLDER),
            complete().channel_id(CHANNEL_PLACEHOLDER),
            complete().channel_id("   "),
        ];

        for builder in cases {
            let err = builder.build().unwrap_err();
            assert!(err.is_config_error(), "unexpected error: {err}");
            assert!(err.to_string().contains("placeholder"));
        }
    }

    #[test]
    fn test_endpoint_override() {
        let config = complete().endpoint("ws://127.0.0.1:9000/").build().unwrap();
        assert_eq!(config.endpoint().as_str(), "ws://127.0.0.1:9000/");
    }

    #[test]
    fn test_endpoint_rejects_other_schemes() {
        let err = complete().endpoint("https://discord.com").build().unwrap_err();
        assert!(err.is_config_error());

        let err = complete().endpoint("not a url").build().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_identify_and_voice_commands() {
        let config = complete().build().unwrap();

        let identify = serde_json::to_value(GatewayCommand::Identify(config.identify())).unwrap();
        assert_eq!(identify["op"], 2);
        assert_eq!(identify["d"]["token"], "MTA4NjQ.GxYz12.abcdefghijklmnop");

        let voice = serde_json::to_value(GatewayCommand::VoiceStateUpdate(config.voice_state_update())).unwrap();
        assert_eq!(voice["op"], 4);
        assert_eq!(voice["d"]["guild_id"], "112233445566778899");
        assert_eq!(voice["d"]["channel_id"], "998877665544332211");
        assert_eq!(voice["d"]["self_deaf"], true);
    }
}
