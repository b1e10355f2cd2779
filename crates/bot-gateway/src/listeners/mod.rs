//! Event handlers and system listeners

mod dispatcher;
mod registry;

pub use dispatcher::{deliver, ListenerDispatcher};
pub use registry::{EventHandler, ListenerRegistry, SharedRegistry, SystemListener};
