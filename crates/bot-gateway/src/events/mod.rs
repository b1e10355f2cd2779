//! Gateway events
//!
//! Dispatch event names, typed payloads, and the connection-level notifications observers receive.

mod event_types;
mod payloads;
mod system;

pub use event_types::GatewayEventType;
pub use payloads::{BotUser, DispatchEvent, MessageCreateEvent, ReadyEvent};
pub use system::{SessionInfo, SystemEvent, SystemEventKind};
