//! Gateway intents
//!
//! Bitmask selecting which dispatch events the server delivers.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Event subscription bitmask sent with Identify
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        const GUILDS = 1 << 0;
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_MODERATION = 1 << 2;
        const GUILD_EXPRESSIONS = 1 << 3;
        const GUILD_INTEGRATIONS = 1 << 4;
        const GUILD_WEBHOOKS = 1 << 5;
        const GUILD_INVITES = 1 << 6;
        const GUILD_VOICE_STATES = 1 << 7;
        const GUILD_PRESENCES = 1 << 8;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING = 1 << 11;
        const DIRECT_MESSAGES = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        const MESSAGE_CONTENT = 1 << 15;
    }
}

impl Intents {
    /// Intents a mention-driven bot needs to see messages and their text
    #[must_use]
    pub const fn messages() -> Self {
        Self::GUILDS
            .union(Self::GUILD_MESSAGES)
            .union(Self::DIRECT_MESSAGES)
            .union(Self::MESSAGE_CONTENT)
    }

    /// Whether any privileged intent is requested (these need approval on the bot's dashboard)
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        self.intersects(
            Self::GUILD_MEMBERS
                .union(Self::GUILD_PRESENCES)
                .union(Self::MESSAGE_CONTENT),
        )
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::messages()
    }
}

// The wire format is the raw integer, not bitflags' textual form
impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Self::from_bits_retain(bits))
    }
}
