//! Close codes
//!
//! Codes seen when a gateway socket ends, and how each one affects the session.

/// Normal closure; the session is discarded and no reconnect follows
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code used when the client drops the socket but wants to resume
pub const RESUMABLE_CLOSURE: u16 = 4000;

/// Reported when the socket vanished without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close codes in the 4000 range sent by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Catch-all; also what this client sends when it drops a socket to resume
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    /// A frame arrived before Identify
    NotAuthenticated = 4003,
    /// Bad token
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    /// Resume carried a sequence the server cannot replay from
    InvalidSequence = 4007,
    RateLimited = 4008,
    /// The session expired on the server
    SessionTimeout = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    /// Privileged intents the application is not approved for
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Gateway code for a raw close code, `None` outside the known set
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimeout),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the session survives a close with this code
    ///
    /// The server forgets the session after an invalid sequence or a session timeout,
    /// so the next handshake must Identify instead of Resume.
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        !matches!(self, Self::InvalidSequence | Self::SessionTimeout)
    }

    /// Whether this code points at a configuration problem that a reconnect will not fix
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Short reason used in logs
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error",
            Self::UnknownOpcode => "Unknown opcode",
            Self::DecodeError => "Payload could not be decoded",
            Self::NotAuthenticated => "Frame sent before identify",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Identified twice",
            Self::InvalidSequence => "Resume sequence rejected",
            Self::RateLimited => "Sending too fast",
            Self::SessionTimeout => "Session expired",
            Self::InvalidShard => "Invalid shard",
            Self::ShardingRequired => "Sharding required",
            Self::InvalidApiVersion => "Unsupported gateway version",
            Self::InvalidIntents => "Malformed intents",
            Self::DisallowedIntents => "Privileged intents not approved",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// Describe a raw close code for logs
#[must_use]
pub fn describe_close(code: u16) -> String {
    match (code, CloseCode::from_u16(code)) {
        (_, Some(known)) => known.to_string(),
        (NORMAL_CLOSURE, None) => format!("Normal closure ({code})"),
        (ABNORMAL_CLOSURE, None) => format!("Abnormal closure ({code})"),
        (_, None) => format!("Unrecognized close code ({code})"),
    }
}
