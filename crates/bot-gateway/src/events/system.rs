//! Connection-level notifications
//!
//! A typed union of everything observers can subscribe to, one kind per variant.

use super::{BotUser, DispatchEvent};

/// Session details reported once the handshake completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    /// The bot user from the last READY; `None` if this process never saw one
    pub user: Option<BotUser>,
    /// `true` when the session was resumed rather than freshly identified
    pub resumed: bool,
}

/// Notification fanned out to system listeners
#[derive(Debug, Clone, PartialEq)]
pub enum SystemEvent {
    /// READY arrived; a fresh session is live
    Connected(SessionInfo),
    /// RESUMED arrived; the previous session continues
    Resumed(SessionInfo),
    /// The socket closed
    Disconnected {
        code: u16,
        /// Whether the manager is going to reconnect on its own
        reconnecting: bool,
    },
    /// Any decoded dispatch frame
    Message(DispatchEvent),
    /// A non-fatal problem worth surfacing (bad frame, transport error)
    Error(String),
}

/// Discriminant of [`SystemEvent`], used as the listener key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEventKind {
    Connected,
    Resumed,
    Disconnected,
    Message,
    Error,
}

impl SystemEvent {
    #[must_use]
    pub fn kind(&self) -> SystemEventKind {
        match self {
            Self::Connected(_) => SystemEventKind::Connected,
            Self::Resumed(_) => SystemEventKind::Resumed,
            Self::Disconnected { .. } => SystemEventKind::Disconnected,
            Self::Message(_) => SystemEventKind::Message,
            Self::Error(_) => SystemEventKind::Error,
        }
    }
}
