//! Connection management
//!
//! The gateway state machine and the bookkeeping it drives: session, heartbeat and jitter.

mod heartbeat;
mod jitter;
pub(crate) mod manager;
mod session;
mod state;

pub use heartbeat::{Heartbeat, HeartbeatTick};
pub use jitter::{FixedRandom, JitterRange, RandomSource, ThreadRandom};
pub use session::SessionState;
pub use state::{ConnectionSnapshot, ConnectionState};
