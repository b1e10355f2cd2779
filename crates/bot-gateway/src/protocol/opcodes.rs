//! Frame op codes
//!
//! The subset of gateway op codes a bot connection exchanges. Anything else
//! fails to deserialize and is treated as a protocol violation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The `op` field of every gateway frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Named event with a sequence number (inbound)
    Dispatch = 0,
    /// Liveness ping; the server may also send one to request an immediate beat
    Heartbeat = 1,
    /// Authenticate and open a fresh session (outbound)
    Identify = 2,
    /// Replay missed events on an existing session (outbound)
    Resume = 6,
    /// Server wants the socket dropped and resumed elsewhere (inbound)
    Reconnect = 7,
    /// Identify or resume was rejected; payload says whether resuming may work (inbound)
    InvalidSession = 9,
    /// First frame on a socket, carries the heartbeat interval (inbound)
    Hello = 10,
    /// Reply to a heartbeat (inbound)
    HeartbeatAck = 11,
}

impl OpCode {
    /// Map a wire value to an op code, `None` for codes this client does not speak
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

        #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the client ever writes this op
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(self, Self::Heartbeat | Self::Identify | Self::Resume)
    }

    /// Whether the client accepts this op from the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        matches!(
            self,
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Name used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value).ok_or_else(|| serde::de::Error::custom(format!("unsupported op code {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
