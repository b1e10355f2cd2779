//! Test helpers for integration tests
//!
//! Provides a scripted transport standing in for the gateway server, an event
//! recorder, and a harness that wires both to a real `GatewayClient`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bot_gateway::{
    ConnectionState, FixedRandom, FrameSink, GatewayClient, GatewayConfig, GatewayError,
    GatewayResult, SessionInfo, SystemEvent, SystemEventKind, Transport, TransportConnection,
    TransportEvent,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::fixtures::{hello, ready, LONG_INTERVAL_MS, TEST_TOKEN};

/// Poll step used by [`eventually`]
const POLL_STEP: Duration = Duration::from_millis(10);

/// Upper bound on polls before [`eventually`] gives up (one minute of virtual time)
const POLL_LIMIT: usize = 6_000;

// ============================================================================
// Scripted transport
// ============================================================================

/// Server side of one socket the client opened
#[derive(Clone)]
pub struct ServerSocket {
    url: String,
    inbound: mpsc::Sender<TransportEvent>,
    sent: Arc<Mutex<Vec<Value>>>,
    closed_with: Arc<Mutex<Option<u16>>>,
}

impl ServerSocket {
    /// Push a JSON frame to the client
    pub async fn send(&self, frame: Value) {
        self.push(TransportEvent::Message(frame.to_string())).await;
    }

    /// Push raw text, valid JSON or not
    pub async fn send_raw(&self, text: &str) {
        self.push(TransportEvent::Message(text.to_string())).await;
    }

    /// Report a socket error
    pub async fn error(&self, message: &str) {
        self.push(TransportEvent::Error(message.to_string())).await;
    }

    /// Close the socket from the server side
    pub async fn close(&self, code: u16) {
        self.push(TransportEvent::Closed(code)).await;
    }

    /// URL the client opened this socket on
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Frames the client wrote to this socket
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// Op codes of the frames the client wrote, in order
    pub fn sent_ops(&self) -> Vec<u64> {
        self.sent
            .lock()
            .iter()
            .filter_map(|frame| frame["op"].as_u64())
            .collect()
    }

    /// Number of frames with the given op code
    pub fn count_op(&self, op: u64) -> usize {
        self.sent_ops().into_iter().filter(|o| *o == op).count()
    }

    /// Last frame with the given op code
    pub fn last_op(&self, op: u64) -> Option<Value> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|frame| frame["op"].as_u64() == Some(op))
            .cloned()
    }

    /// Close code the client used, if it closed this socket
    pub fn closed_with(&self) -> Option<u16> {
        *self.closed_with.lock()
    }

    async fn push(&self, event: TransportEvent) {
        // The client may already have dropped this socket
        let _ = self.inbound.send(event).await;
    }
}

struct RecordingSink {
    sent: Arc<Mutex<Vec<Value>>>,
    closed_with: Arc<Mutex<Option<u16>>>,
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        if self.closed_with.lock().is_some() {
            return Err(GatewayError::Transport("socket closed".to_string()));
        }
        self.sent.lock().push(serde_json::from_str(&text)?);
        Ok(())
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        *self.closed_with.lock() = Some(code);
        Ok(())
    }
}

/// In-memory transport that records every socket the client opens
#[derive(Default)]
pub struct ScriptedTransport {
    sockets: Mutex<Vec<ServerSocket>>,
    refusals: Mutex<VecDeque<String>>,
    hang_next: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `open()` fail with a transport error
    pub fn refuse_next_open(&self, reason: &str) {
        self.refusals.lock().push_back(reason.to_string());
    }

    /// Make the next `open()` never complete
    pub fn hang_next_open(&self) {
        self.hang_next.store(true, Ordering::SeqCst);
    }

    /// Number of successful `open()` calls so far
    pub fn open_count(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Socket opened by the `index`-th successful `open()`
    pub fn socket(&self, index: usize) -> ServerSocket {
        self.sockets.lock()[index].clone()
    }

    /// Most recently opened socket
    pub fn latest(&self) -> ServerSocket {
        let sockets = self.sockets.lock();
        sockets[sockets.len() - 1].clone()
    }

    /// Wait until `count` sockets have been opened and return the last one
    pub async fn wait_for_socket(&self, count: usize) -> ServerSocket {
        eventually(|| self.open_count() >= count).await;
        self.socket(count - 1)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &str) -> GatewayResult<TransportConnection> {
        if self.hang_next.swap(false, Ordering::SeqCst) {
            return std::future::pending().await;
        }
        if let Some(reason) = self.refusals.lock().pop_front() {
            return Err(GatewayError::Transport(reason));
        }

        let (inbound, events) = mpsc::channel(64);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed_with = Arc::new(Mutex::new(None));

        self.sockets.lock().push(ServerSocket {
            url: url.to_string(),
            inbound,
            sent: sent.clone(),
            closed_with: closed_with.clone(),
        });

        Ok(TransportConnection {
            sink: Box::new(RecordingSink { sent, closed_with }),
            events,
        })
    }
}

// ============================================================================
// Event recorder
// ============================================================================

/// Records every system event a client emits
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SystemEvent>>>,
}

impl EventLog {
    /// Subscribe to every event kind on the client
    pub fn attach(client: &GatewayClient) -> Self {
        let log = Self::default();
        for kind in [
            SystemEventKind::Connected,
            SystemEventKind::Resumed,
            SystemEventKind::Disconnected,
            SystemEventKind::Message,
            SystemEventKind::Error,
        ] {
            let events = log.events.clone();
            client.on(kind, move |event| events.lock().push(event.clone()));
        }
        log
    }

    pub fn all(&self) -> Vec<SystemEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: SystemEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// `(code, reconnecting)` of every Disconnected event
    pub fn disconnects(&self) -> Vec<(u16, bool)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SystemEvent::Disconnected { code, reconnecting } => Some((*code, *reconnecting)),
                _ => None,
            })
            .collect()
    }

    /// Names of the dispatch events delivered, in order
    pub fn dispatch_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SystemEvent::Message(dispatch) => Some(dispatch.name.clone()),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A client wired to a scripted transport with deterministic jitter
///
/// Jitter always takes the low end of each range: reconnects wait 1s and
/// invalid-session re-authentication waits 2s.
pub struct TestGateway {
    pub client: GatewayClient,
    pub transport: Arc<ScriptedTransport>,
    pub events: EventLog,
}

impl TestGateway {
    pub fn start() -> Self {
        Self::start_with_config(test_config())
    }

    pub fn start_with_config(config: GatewayConfig) -> Self {
        let transport = ScriptedTransport::new();
        let client = GatewayClient::builder(config)
            .transport(transport.clone())
            .random(Box::new(FixedRandom(0)))
            .build();
        let events = EventLog::attach(&client);

        Self {
            client,
            transport,
            events,
        }
    }

    /// Start `connect()` on its own task
    pub fn spawn_connect(&self) -> tokio::task::JoinHandle<GatewayResult<SessionInfo>> {
        let client = self.client.clone();
        tokio::spawn(async move { client.connect().await })
    }

    /// Connect and complete a fresh handshake with READY at `seq`
    pub async fn connect_ready(&self, interval_ms: u64, seq: u64) -> ServerSocket {
        let pending = self.spawn_connect();
        let socket = self.transport.wait_for_socket(self.transport.open_count() + 1).await;
        socket.send(hello(interval_ms)).await;
        socket.send(ready(seq)).await;

        let session = pending
            .await
            .expect("connect task panicked")
            .expect("connect failed");
        assert!(!session.resumed);
        socket
    }

    /// Connect with an interval no test will reach
    pub async fn connect_default(&self) -> ServerSocket {
        self.connect_ready(LONG_INTERVAL_MS, 1).await
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    /// Wait until the client reaches `state`
    pub async fn wait_for_state(&self, state: ConnectionState) {
        eventually(|| self.client.state() == state).await;
    }
}

/// Config pointing nowhere; the scripted transport ignores the URL
pub fn test_config() -> GatewayConfig {
    GatewayConfig::new("wss://gateway.test/?v=10&encoding=json", TEST_TOKEN)
}

/// Poll `condition` in small steps of virtual time until it holds
///
/// Panics after a minute of virtual time.
pub async fn eventually<F>(condition: F)
where
    F: Fn() -> bool,
{
    for _ in 0..POLL_LIMIT {
        if condition() {
            return;
        }
        tokio::time::sleep(POLL_STEP).await;
    }
    panic!("condition not met within {:?}", POLL_STEP * POLL_LIMIT as u32);
}

/// Let spawned tasks run without advancing the clock
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
