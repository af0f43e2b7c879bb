//! Environment variable loading.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `DISCORD_TOKEN` | yes | |
//! | `DISCORD_GUILD_ID` | yes | |
//! | `DISCORD_CHANNEL_ID` | yes | |
//! | `DISCORD_SELF_MUTE` | no | `false` |
//! | `DISCORD_SELF_DEAF` | no | `true` |
//! | `DISCORD_GATEWAY_URL` | no | `wss://gateway.discord.gg/?v=9&encoding=json` |
//! | `VOICE_CONNECTOR_LOG` | no | `voice_connector.log` |

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

use super::{ConnectorConfig, ConnectorConfigBuilder};

// ============================================================================
// Constants
// ============================================================================

/// Account token variable.
pub const TOKEN_VAR: &str = "DISCORD_TOKEN";

/// Guild id variable.
pub const GUILD_ID_VAR: &str = "DISCORD_GUILD_ID";

/// Voice channel id variable.
pub const CHANNEL_ID_VAR: &str = "DISCORD_CHANNEL_ID";

/// Self-mute flag variable.
pub const SELF_MUTE_VAR: &str = "DISCORD_SELF_MUTE";

/// Self-deafen flag variable.
pub const SELF_DEAF_VAR: &str = "DISCORD_SELF_DEAF";

/// Gateway endpoint override variable.
pub const GATEWAY_URL_VAR: &str = "DISCORD_GATEWAY_URL";

/// Log file path variable.
pub const LOG_FILE_VAR: &str = "VOICE_CONNECTOR_LOG";

// ============================================================================
// Loading
// ============================================================================

impl ConnectorConfig {
    /// Loads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing, blank, or
    /// a placeholder, or if a flag is not a boolean.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectorConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = |key: &str| Error::config(format!("{key} is not set"));

        let mut builder = ConnectorConfigBuilder::new()
            .token(lookup(TOKEN_VAR).ok_or_else(|| missing(TOKEN_VAR))?)
            .guild_id(lookup(GUILD_ID_VAR).ok_or_else(|| missing(GUILD_ID_VAR))?)
            .channel_id(lookup(CHANNEL_ID_VAR).ok_or_else(|| missing(CHANNEL_ID_VAR))?);

        if let Some(value) = lookup(SELF_MUTE_VAR) {
            builder = builder.self_mute(parse_flag(SELF_MUTE_VAR, &value)?);
        }
        if let Some(value) = lookup(SELF_DEAF_VAR) {
            builder = builder.self_deaf(parse_flag(SELF_DEAF_VAR, &value)?);
        }
        if let Some(value) = lookup(GATEWAY_URL_VAR) {
            builder = builder.endpoint(value);
        }
        if let Some(value) = lookup(LOG_FILE_VAR) {
            builder = builder.log_file(value);
        }

        builder.build()
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!(
            "{key} must be a boolean (true/false), got {other:?}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
