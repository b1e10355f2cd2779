//! Connection state
//!
//! The lifecycle states of the gateway connection and the snapshot published to observers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No socket; initial state and the state after `disconnect()`
    #[default]
    Disconnected,
    /// Socket opening or open, handshake not finished
    Connecting,
    /// READY or RESUMED received
    Connected,
    /// Socket lost, waiting for the reconnect timer
    Reconnecting,
    /// Reopened socket that will Resume when HELLO arrives
    Resuming,
}

impl ConnectionState {
    /// Whether a `connect()` call is allowed from this state
    #[must_use]
    pub const fn accepts_connect(self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Whether the manager is still working toward a connection on its own
    #[must_use]
    pub const fn is_recovering(self) -> bool {
        matches!(self, Self::Reconnecting | Self::Resuming)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Resuming => "resuming",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the connection, published after every transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub sequence: Option<u64>,
    /// A heartbeat deadline is armed
    pub heartbeat_armed: bool,
    /// A reconnect deadline is armed
    pub reconnect_pending: bool,
    /// A handshake deadline is armed
    pub handshake_pending: bool,
    /// A deferred Identify/Resume after INVALID_SESSION is armed
    pub reauth_pending: bool,
    /// A socket is currently open
    pub transport_open: bool,
    /// A socket open is in flight
    pub transport_opening: bool,
}

impl ConnectionSnapshot {
    /// No timer of any kind is armed and no socket open is in flight
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.transport_opening
            && !self.heartbeat_armed
            && !self.reconnect_pending
            && !self.handshake_pending
            && !self.reauth_pending
    }
}
