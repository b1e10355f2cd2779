//! Socket abstraction
//!
//! The connection manager only sees text frames going out and [`TransportEvent`]s
//! coming in, so tests can swap the WebSocket for a scripted peer.

mod websocket;

pub use websocket::WebSocketTransport;

use crate::error::GatewayResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Something that happened on an open socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived
    Message(String),
    /// The socket reported an error; a `Closed` follows
    Error(String),
    /// The socket closed with this code; nothing follows
    Closed(u16),
}

/// Outbound half of an open socket
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> GatewayResult<()>;

    /// Close the socket with the given code
    async fn close(&mut self, code: u16) -> GatewayResult<()>;
}

/// An open socket: the sink plus the stream of inbound events
pub struct TransportConnection {
    pub sink: Box<dyn FrameSink>,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl std::fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnection").finish()
    }
}

/// Opens sockets to the gateway
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str) -> GatewayResult<TransportConnection>;
}
