//! Gateway client handle
//!
//! The public face of the connection manager. Cloning is cheap and every clone
//! drives the same connection; the manager shuts down when the last clone drops.

use crate::config::GatewayConfig;
use crate::connection::manager::{Command, ConnectionManager};
use crate::connection::{ConnectionSnapshot, ConnectionState, RandomSource, ThreadRandom};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{SessionInfo, SystemEvent, SystemEventKind};
use crate::listeners::{EventHandler, ListenerDispatcher, ListenerRegistry, SharedRegistry};
use crate::transport::{Transport, WebSocketTransport};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Command queue depth; commands are rare and answered quickly
const COMMAND_BUFFER: usize = 16;

/// Handle to a gateway connection
#[derive(Clone)]
pub struct GatewayClient {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<ConnectionSnapshot>,
    registry: SharedRegistry,
}

impl GatewayClient {
    /// Client over a real WebSocket; must be called inside a Tokio runtime
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self::builder(config).build()
    }

    #[must_use]
    pub fn builder(config: GatewayConfig) -> GatewayClientBuilder {
        GatewayClientBuilder {
            config,
            transport: None,
            random: None,
        }
    }

    /// Open the socket and wait for READY
    ///
    /// Fails with `AlreadyConnected` unless the client is Disconnected, `Timeout` if the
    /// handshake does not finish in time, and `Transport` if the socket fails first.
    pub async fn connect(&self) -> GatewayResult<SessionInfo> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Connect(reply))
            .await
            .map_err(|_| GatewayError::ActorClosed)?;
        response.await.map_err(|_| GatewayError::ActorClosed)?
    }

    /// Close the socket with a normal closure and cancel every timer
    ///
    /// Idempotent; a `connect()` still waiting fails with `Closed`.
    pub async fn disconnect(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Disconnect(reply)).await.is_err() {
            return;
        }
        let _ = done.await;
    }

    /// Register the handler for a dispatch event name, replacing any previous one
    ///
    /// Returns `true` if a handler was replaced.
    pub fn on_event<H>(&self, name: impl Into<String>, handler: H) -> bool
    where
        H: EventHandler + 'static,
    {
        self.registry.write().set_handler(name, Arc::new(handler))
    }

    /// Remove the handler for a dispatch event name; returns `true` if one was registered
    pub fn remove_event(&self, name: &str) -> bool {
        self.registry.write().remove_handler(name)
    }

    /// Add a listener for one kind of system event
    pub fn on<F>(&self, kind: SystemEventKind, listener: F)
    where
        F: Fn(&SystemEvent) + Send + Sync + 'static,
    {
        self.registry.write().add_listener(kind, Arc::new(listener));
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that sees every published snapshot
    pub fn watch(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.snapshot.clone()
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for swapping the transport or random source
pub struct GatewayClientBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn Transport>>,
    random: Option<Box<dyn RandomSource>>,
}

impl GatewayClientBuilder {
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Spawn the connection manager and listener dispatcher
    #[must_use]
    pub fn build(self) -> GatewayClient {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new()));
        let random = self.random.unwrap_or_else(|| Box::new(ThreadRandom));

        let registry = ListenerRegistry::new_shared();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ConnectionSnapshot::default());

        ListenerDispatcher::new(registry.clone(), event_rx).start();
        let manager =
            ConnectionManager::new(self.config, transport, random, command_rx, event_tx, snapshot_tx);
        tokio::spawn(manager.run());

        GatewayClient {
            commands: command_tx,
            snapshot: snapshot_rx,
            registry,
        }
    }
}
