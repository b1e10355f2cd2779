//! Handler and listener registry
//!
//! One handler per dispatch name plus ordered observer lists per system event kind.

use crate::events::{DispatchEvent, SystemEvent, SystemEventKind};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Handles dispatch events of one name
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DispatchEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(&DispatchEvent) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, event: &DispatchEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Observer of connection-level notifications
pub type SystemListener = Arc<dyn Fn(&SystemEvent) + Send + Sync>;

/// Registry shared between the client handle and the delivery task
pub type SharedRegistry = Arc<RwLock<ListenerRegistry>>;

/// Registered handlers and listeners
#[derive(Default)]
pub struct ListenerRegistry {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
    listeners: HashMap<SystemEventKind, Vec<SystemListener>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new_shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Register the handler for an event name, replacing any previous one
    ///
    /// Returns `true` if a handler was replaced.
    pub fn set_handler(&mut self, name: impl Into<String>, handler: Arc<dyn EventHandler>) -> bool {
        self.handlers.insert(name.into(), handler).is_some()
    }

    /// Remove the handler for an event name; returns `true` if one was registered
    pub fn remove_handler(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn EventHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Append a listener for one kind of system event
    pub fn add_listener(&mut self, kind: SystemEventKind, listener: SystemListener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    /// Listeners for a kind, in registration order
    pub fn listeners(&self, kind: SystemEventKind) -> Vec<SystemListener> {
        self.listeners.get(&kind).cloned().unwrap_or_default()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("listener_kinds", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}
