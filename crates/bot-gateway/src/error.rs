//! Gateway error types

use thiserror::Error;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The handshake did not complete in time
    #[error("Handshake did not complete within {0:?}")]
    Timeout(std::time::Duration),

    /// The underlying socket failed or closed before the handshake completed
    #[error("Transport error: {0}")]
    Transport(String),

    /// `connect()` called while a connection is in progress or established
    #[error("Already connecting or connected")]
    AlreadyConnected,

    /// Malformed or unexpected frame
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The server rejected the session
    #[error("Session invalidated by the server")]
    SessionInvalidated,

    /// `disconnect()` was called before the handshake completed
    #[error("Connection closed before the handshake completed")]
    Closed,

    /// The connection task is no longer running
    #[error("Connection manager has shut down")]
    ActorClosed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether retrying `connect()` later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport(_) | Self::SessionInvalidated
        )
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
