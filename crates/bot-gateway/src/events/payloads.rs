//! Event payload definitions
//!
//! Typed views of the dispatch payloads the bot cares about.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded dispatch frame (op 0)
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    /// Event name from the `t` field
    pub name: String,
    /// Sequence number from the `s` field, if the frame carried one
    pub sequence: Option<u64>,
    /// Raw event data
    pub data: Value,
}

impl DispatchEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, sequence: Option<u64>, data: Value) -> Self {
        Self {
            name: name.into(),
            sequence,
            data,
        }
    }

    /// Decode the event data into a typed payload
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

// === Session Events ===

/// READY event payload
///
/// Sent after successful Identify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Session ID for resuming
    pub session_id: String,

    /// The bot's own user
    pub user: BotUser,

    /// Gateway URL to use when resuming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
}

/// User data included in events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUser {
    #[serde(default)]
    pub id: String,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(default)]
    pub bot: bool,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl BotUser {
    /// `name#1234`, or just the name for accounts on the new username system
    #[must_use]
    pub fn tag(&self) -> String {
        if self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }
}

// === Message Events ===

/// MESSAGE_CREATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreateEvent {
    pub id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    pub author: BotUser,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<BotUser>,
}

impl MessageCreateEvent {
    /// Whether the message mentions the given user ID
    #[must_use]
    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }

    /// Message text with `<@id>` / `<@!id>` mentions of the given user removed
    #[must_use]
    pub fn content_without_mention(&self, user_id: &str) -> String {
        self.content
            .replace(&format!("<@{user_id}>"), "")
            .replace(&format!("<@!{user_id}>"), "")
            .trim()
            .to_string()
    }
}
