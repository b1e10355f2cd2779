//! # bot-gateway
//!
//! Client-side gateway connection manager: opens the socket, authenticates with
//! Identify or Resume, keeps the heartbeat alive, recovers from dropped connections
//! and routes dispatch events to registered handlers.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod listeners;
pub mod protocol;
pub mod transport;

pub use client::{GatewayClient, GatewayClientBuilder};
pub use config::GatewayConfig;
pub use connection::{ConnectionSnapshot, ConnectionState, FixedRandom, JitterRange, RandomSource};
pub use error::{GatewayError, GatewayResult};
pub use events::{DispatchEvent, SessionInfo, SystemEvent, SystemEventKind};
pub use listeners::EventHandler;
pub use transport::{FrameSink, Transport, TransportConnection, TransportEvent};
