//! Listener delivery
//!
//! Runs user code on its own task so a slow handler never delays heartbeats.

use super::registry::SharedRegistry;
use crate::events::SystemEvent;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delivers system events to handlers and listeners, one event at a time
pub struct ListenerDispatcher {
    registry: SharedRegistry,
    events: mpsc::UnboundedReceiver<SystemEvent>,
}

impl ListenerDispatcher {
    #[must_use]
    pub fn new(registry: SharedRegistry, events: mpsc::UnboundedReceiver<SystemEvent>) -> Self {
        Self { registry, events }
    }

    /// Spawn the delivery task; it ends when every sender is dropped
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            deliver(&self.registry, &event).await;
        }
        tracing::debug!("Listener dispatcher stopped");
    }
}

/// Deliver one event: the named handler first (for dispatches), then the kind's listeners
///
/// Errors and panics are logged and never stop delivery.
pub async fn deliver(registry: &SharedRegistry, event: &SystemEvent) {
    if let SystemEvent::Message(dispatch) = event {
        let handler = registry.read().handler(&dispatch.name);
        if let Some(handler) = handler {
            match AssertUnwindSafe(handler.handle(dispatch)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(event = %dispatch.name, error = %e, "Event handler failed");
                }
                Err(_) => {
                    tracing::error!(event = %dispatch.name, "Event handler panicked");
                }
            }
        }
    }

    let listeners = registry.read().listeners(event.kind());
    for listener in listeners {
        if std::panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
            tracing::error!(kind = ?event.kind(), "System listener panicked");
        }
    }
}
