//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol including op codes, frame format, intents, and close codes.

mod close_codes;
mod intents;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{describe_close, CloseCode, ABNORMAL_CLOSURE, NORMAL_CLOSURE, RESUMABLE_CLOSURE};
pub use intents::Intents;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, ResumePayload};
