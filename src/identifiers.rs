//! Type-safe identifier wrappers.
//!
//! Discord identifiers are snowflakes transmitted as JSON strings. They are
//! kept as strings here and only compared, never parsed.
//!
//! | Type | Identifies |
//! |------|------------|
//! | [`GuildId`] | Guild (server) |
//! | [`ChannelId`] | Voice channel inside a guild |
//! | [`UserId`] | Account that a voice state belongs to |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Macro
// ============================================================================

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from its string form.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// ============================================================================
// Identifiers
// ============================================================================

snowflake!(
    /// Guild identifier.
    GuildId
);

snowflake!(
    /// Channel identifier.
    ChannelId
);

snowflake!(
    /// User identifier.
    UserId
);

// ============================================================================
// Tests
// ============================================================================
