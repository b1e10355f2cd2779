//! Dispatch event names
//!
//! The `t` values the connection manager or the bot binary look at by name.
//! Every other dispatch is still delivered, keyed by its raw name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch names with special meaning to this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    /// Completes an Identify; carries the session id and bot user
    Ready,
    /// Completes a Resume; missed events were replayed before it
    Resumed,
    GuildCreate,
    GuildDelete,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    InteractionCreate,
}

impl GatewayEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::InteractionCreate => "INTERACTION_CREATE",
        }
    }

    /// Known variant for a dispatch name; matching is case-sensitive
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let known = [
            Self::Ready,
            Self::Resumed,
            Self::GuildCreate,
            Self::GuildDelete,
            Self::MessageCreate,
            Self::MessageUpdate,
            Self::MessageDelete,
            Self::InteractionCreate,
        ];
        known.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
