//! Connection manager
//!
//! A single task owns the socket, the session, every timer and the state machine.
//! Client handles talk to it over a command channel, and it reports through a
//! snapshot watch and an event channel drained by the listener dispatcher.
//! Because one task does everything, no two transitions ever interleave.

use super::heartbeat::{Heartbeat, HeartbeatTick};
use super::jitter::RandomSource;
use super::session::SessionState;
use super::state::{ConnectionSnapshot, ConnectionState};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::events::{DispatchEvent, GatewayEventType, ReadyEvent, SessionInfo, SystemEvent};
use crate::protocol::{
    describe_close, CloseCode, GatewayMessage, IdentifyPayload, OpCode, ABNORMAL_CLOSURE,
    NORMAL_CLOSURE, RESUMABLE_CLOSURE,
};
use crate::transport::{FrameSink, Transport, TransportConnection, TransportEvent};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

/// How long a close frame may take before the socket is simply dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Requests from client handles
pub(crate) enum Command {
    Connect(oneshot::Sender<GatewayResult<SessionInfo>>),
    Disconnect(oneshot::Sender<()>),
}

/// A socket open in flight, owned so dropping it cancels the attempt
type PendingOpen = BoxFuture<'static, GatewayResult<TransportConnection>>;

/// What to send when a deferred re-authentication fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reauth {
    Resume,
    Identify,
}

/// Owns one gateway connection and drives it through its lifecycle
pub(crate) struct ConnectionManager {
    config: GatewayConfig,
    transport: Arc<dyn Transport>,
    rng: Box<dyn RandomSource>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<SystemEvent>,
    snapshot: watch::Sender<ConnectionSnapshot>,

    state: ConnectionState,
    session: SessionState,
    opening: Option<PendingOpen>,
    sink: Option<Box<dyn FrameSink>>,
    inbound: Option<mpsc::Receiver<TransportEvent>>,
    heartbeat: Option<Heartbeat>,
    reconnect_at: Option<Instant>,
    handshake_deadline: Option<Instant>,
    reauth: Option<(Instant, Reauth)>,
    pending_connect: Option<oneshot::Sender<GatewayResult<SessionInfo>>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
        rng: Box<dyn RandomSource>,
        commands: mpsc::Receiver<Command>,
        events: mpsc::UnboundedSender<SystemEvent>,
        snapshot: watch::Sender<ConnectionSnapshot>,
    ) -> Self {
        Self {
            config,
            transport,
            rng,
            commands,
            events,
            snapshot,
            state: ConnectionState::Disconnected,
            session: SessionState::new(),
            opening: None,
            sink: None,
            inbound: None,
            heartbeat: None,
            reconnect_at: None,
            handshake_deadline: None,
            reauth: None,
            pending_connect: None,
        }
    }

    /// Run until every client handle is dropped
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        tracing::debug!("All client handles dropped; shutting down");
                        self.shutdown().await;
                        break;
                    }
                },
                opened = next_open_result(&mut self.opening) => {
                    self.opening = None;
                    self.on_transport_opened(opened).await;
                }
                event = next_transport_event(&mut self.inbound) => {
                    self.handle_transport_event(event).await;
                }
                () = sleep_until_armed(self.heartbeat.as_ref().map(Heartbeat::next_at)) => {
                    self.on_heartbeat_due().await;
                }
                () = sleep_until_armed(self.reconnect_at) => self.on_reconnect_due(),
                () = sleep_until_armed(self.handshake_deadline) => self.on_handshake_timeout().await,
                () = sleep_until_armed(self.reauth.map(|(at, _)| at)) => self.on_reauth_due().await,
            }
            self.publish();
        }
        self.publish();
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => {
                if !self.state.accepts_connect() {
                    tracing::debug!(state = %self.state, "Rejecting connect; already active");
                    let _ = reply.send(Err(GatewayError::AlreadyConnected));
                    return;
                }
                tracing::info!(url = %self.config.url, "Connecting to gateway");
                self.state = ConnectionState::Connecting;
                self.pending_connect = Some(reply);
                let url = self.config.url.clone();
                self.open_transport(url);
            }
            Command::Disconnect(reply) => {
                self.shutdown().await;
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    /// Cancel everything and return to Disconnected; safe to call in any state
    async fn shutdown(&mut self) {
        let was = self.state;
        self.close_transport(NORMAL_CLOSURE).await;
        self.clear_timers();
        self.session.invalidate();
        self.state = ConnectionState::Disconnected;
        self.answer_connect(Err(GatewayError::Closed));

        if was.is_recovering() {
            tracing::info!(previous = %was, "Abandoning reconnect");
        }
        if was != ConnectionState::Disconnected {
            tracing::info!(previous = %was, "Disconnected from gateway");
            self.emit(SystemEvent::Disconnected {
                code: NORMAL_CLOSURE,
                reconnecting: false,
            });
        }
    }

    // ========================================================================
    // Socket lifecycle
    // ========================================================================

    /// Start opening a socket and arm the handshake deadline
    ///
    /// The open is polled by the run loop, so commands are still served while it is
    /// in flight and the handshake deadline also bounds how long it may take.
    fn open_transport(&mut self, url: String) {
        self.handshake_deadline = Some(Instant::now() + self.config.handshake_timeout);

        let transport = self.transport.clone();
        tracing::debug!(url = %url, state = %self.state, "Opening gateway socket");
        self.opening = Some(Box::pin(async move { transport.open(&url).await }));
    }

    async fn on_transport_opened(&mut self, result: GatewayResult<TransportConnection>) {
        match result {
            Ok(connection) => {
                tracing::debug!(state = %self.state, "Gateway socket opened");
                self.sink = Some(connection.sink);
                self.inbound = Some(connection.events);
            }
            Err(e) => self.on_handshake_failure(e).await,
        }
    }

    /// The socket could not be opened, errored, or the handshake never finished
    ///
    /// A caller waiting in `connect()` gets the error and the manager goes back to
    /// Disconnected. During automatic recovery another reconnect is scheduled instead.
    async fn on_handshake_failure(&mut self, error: GatewayError) {
        if self.pending_connect.is_some() {
            tracing::warn!(error = %error, "Gateway handshake failed");
            self.close_transport(NORMAL_CLOSURE).await;
            self.clear_timers();
            self.state = ConnectionState::Disconnected;
            self.answer_connect(Err(error));
            return;
        }

        tracing::warn!(error = %error, "Reconnect attempt failed; retrying");
        self.close_transport(RESUMABLE_CLOSURE).await;
        let delay = self.config.reconnect_jitter.sample(self.rng.as_mut());
        self.schedule_reconnect(delay);
    }

    /// Close the socket (best effort) and drop everything tied to it
    async fn close_transport(&mut self, code: u16) {
        if self.opening.take().is_some() {
            tracing::debug!("Cancelled socket open");
        }
        self.heartbeat = None;
        self.reauth = None;
        self.inbound = None;

        if let Some(mut sink) = self.sink.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.close(code)).await {
                Ok(Ok(())) => tracing::debug!(code, "Gateway socket closed"),
                Ok(Err(e)) => tracing::debug!(code, error = %e, "Close frame not delivered"),
                Err(_) => tracing::debug!(code, "Close frame timed out"),
            }
        }
    }

    /// The socket is gone; recover according to the close code
    async fn on_connection_lost(&mut self, code: u16, delay: Option<Duration>) {
        self.close_transport(code).await;

        if self.pending_connect.is_some() {
            let reason = describe_close(code);
            self.on_handshake_failure(GatewayError::Transport(format!(
                "socket closed during handshake: {reason}"
            )))
            .await;
            return;
        }

        if code == NORMAL_CLOSURE {
            tracing::info!(code, "Gateway closed the connection normally");
            self.clear_timers();
            self.session.invalidate();
            self.state = ConnectionState::Disconnected;
            self.emit(SystemEvent::Disconnected {
                code,
                reconnecting: false,
            });
            return;
        }

        match CloseCode::from_u16(code) {
            Some(close) if close.is_fatal() => {
                tracing::error!(close = %close, "Gateway rejected the session; reconnecting anyway");
                if !close.is_resumable() {
                    self.session.invalidate();
                }
            }
            Some(close) if !close.is_resumable() => {
                tracing::warn!(close = %close, "Gateway session cannot be resumed");
                self.session.invalidate();
            }
            _ => {
                tracing::warn!(code, reason = %describe_close(code), "Gateway connection lost");
            }
        }

        self.emit(SystemEvent::Disconnected {
            code,
            reconnecting: true,
        });

        let delay = delay.unwrap_or_else(|| self.config.reconnect_jitter.sample(self.rng.as_mut()));
        self.schedule_reconnect(delay);
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.heartbeat = None;
        self.reauth = None;
        self.handshake_deadline = None;
        self.state = ConnectionState::Reconnecting;
        self.reconnect_at = Some(Instant::now() + delay);

        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            resumable = self.session.can_resume(),
            "Reconnect scheduled"
        );
    }

    /// Reopen the socket, on the resume URL from READY when the session can be resumed
    fn on_reconnect_due(&mut self) {
        self.reconnect_at = None;
        let url = if self.session.can_resume() {
            self.state = ConnectionState::Resuming;
            self.session
                .resume_url(&self.config.url)
                .unwrap_or_else(|| self.config.url.clone())
        } else {
            self.state = ConnectionState::Connecting;
            self.config.url.clone()
        };

        tracing::info!(state = %self.state, "Reopening gateway connection");
        self.open_transport(url);
    }

    async fn on_handshake_timeout(&mut self) {
        self.handshake_deadline = None;
        let timeout = self.config.handshake_timeout;
        tracing::warn!(
            timeout_secs = timeout.as_secs(),
            state = %self.state,
            "No READY or RESUMED before the handshake deadline"
        );
        self.on_handshake_failure(GatewayError::Timeout(timeout)).await;
    }

    // ========================================================================
    // Inbound traffic
    // ========================================================================

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => self.handle_frame(&text).await,
            TransportEvent::Error(error) => {
                if self.pending_connect.is_some() {
                    self.on_handshake_failure(GatewayError::Transport(error)).await;
                } else {
                    tracing::warn!(error = %error, "Gateway socket error");
                    self.emit(SystemEvent::Error(GatewayError::Transport(error).to_string()));
                }
            }
            TransportEvent::Closed(code) => self.on_connection_lost(code, None).await,
        }
    }

    async fn handle_frame(&mut self, text: &str) {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                self.report_violation(format!("malformed frame: {e}"));
                return;
            }
        };

        tracing::trace!(op = %message.op, seq = ?message.s, "Frame received");

        if !message.op.is_server_op() {
            self.report_violation(format!("client-only op code {} from server", message.op));
            return;
        }

        match message.op {
            OpCode::Hello => self.on_hello(&message).await,
            OpCode::HeartbeatAck => {
                if let Some(heartbeat) = self.heartbeat.as_mut() {
                    heartbeat.acknowledge();
                    tracing::trace!("Heartbeat acknowledged");
                }
            }
            OpCode::Heartbeat => {
                tracing::trace!("Heartbeat requested by gateway");
                self.send_heartbeat().await;
            }
            OpCode::Reconnect => {
                tracing::info!("Gateway requested a reconnect");
                self.on_connection_lost(RESUMABLE_CLOSURE, Some(Duration::ZERO))
                    .await;
            }
            OpCode::InvalidSession => {
                self.on_invalid_session(message.as_invalid_session().unwrap_or(false));
            }
            OpCode::Dispatch => self.on_dispatch(message),
            OpCode::Identify | OpCode::Resume => {}
        }
    }

    async fn on_hello(&mut self, message: &GatewayMessage) {
        let interval = match message.as_hello() {
            Some(hello) if hello.heartbeat_interval > 0 => {
                Duration::from_millis(hello.heartbeat_interval)
            }
            _ => {
                self.report_violation("HELLO without a usable heartbeat interval".to_string());
                return;
            }
        };

        if self.state == ConnectionState::Connected {
            tracing::warn!("Ignoring HELLO on an established session");
            return;
        }

        self.heartbeat = Some(Heartbeat::start(interval, Instant::now()));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");

        let resuming = self.state == ConnectionState::Resuming;
        self.state = ConnectionState::Connecting;

        if resuming {
            self.send_resume().await;
        } else {
            self.send_identify().await;
        }
    }

    fn on_invalid_session(&mut self, resumable: bool) {
        let reauth = if resumable && self.session.can_resume() {
            Reauth::Resume
        } else {
            if !resumable {
                self.session.invalidate();
            }
            Reauth::Identify
        };

        let delay = self.config.invalid_session_jitter.sample(self.rng.as_mut());
        tracing::warn!(
            resumable,
            delay_ms = delay.as_millis() as u64,
            error = %GatewayError::SessionInvalidated,
            "Gateway invalidated the session"
        );
        self.reauth = Some((Instant::now() + delay, reauth));
    }

    async fn on_reauth_due(&mut self) {
        let Some((_, reauth)) = self.reauth.take() else {
            return;
        };
        match reauth {
            Reauth::Resume => self.send_resume().await,
            Reauth::Identify => self.send_identify().await,
        }
    }

    /// Update the sequence, handle READY/RESUMED, then hand the event to listeners
    fn on_dispatch(&mut self, message: GatewayMessage) {
        let Some(name) = message.t else {
            self.report_violation("DISPATCH without an event name".to_string());
            return;
        };
        let kind = GatewayEventType::parse(&name);

        if let Some(seq) = message.s {
            if kind == Some(GatewayEventType::Ready) {
                self.session.restart_sequence(seq);
            } else if !self.session.observe_sequence(seq) {
                tracing::warn!(
                    seq,
                    current = ?self.session.sequence(),
                    event = %name,
                    "Ignoring sequence that moves backward"
                );
            }
        }

        let event = DispatchEvent::new(name, message.s, message.d);
        match kind {
            Some(GatewayEventType::Ready) => self.on_ready(&event),
            Some(GatewayEventType::Resumed) => self.on_resumed(),
            _ => {}
        }

        self.emit(SystemEvent::Message(event));
    }

    fn on_ready(&mut self, event: &DispatchEvent) {
        let ready: ReadyEvent = match event.payload() {
            Ok(ready) => ready,
            Err(e) => {
                self.report_violation(format!("unreadable READY payload: {e}"));
                return;
            }
        };

        tracing::info!(
            session_id = %ready.session_id,
            user = %ready.user.tag(),
            "Gateway session ready"
        );
        self.session
            .establish(ready.session_id, ready.user, ready.resume_gateway_url);
        self.complete_handshake(false);
    }

    fn on_resumed(&mut self) {
        if self.session.session_id().is_none() {
            self.report_violation("RESUMED without a session to resume".to_string());
            return;
        }
        tracing::info!(seq = ?self.session.sequence(), "Gateway session resumed");
        self.complete_handshake(true);
    }

    fn complete_handshake(&mut self, resumed: bool) {
        self.handshake_deadline = None;
        self.state = ConnectionState::Connected;

        let Some(info) = self.session.info(resumed) else {
            return;
        };
        self.answer_connect(Ok(info.clone()));
        self.emit(if resumed {
            SystemEvent::Resumed(info)
        } else {
            SystemEvent::Connected(info)
        });
    }

    // ========================================================================
    // Outbound traffic
    // ========================================================================

    async fn on_heartbeat_due(&mut self) {
        let Some(heartbeat) = self.heartbeat.as_mut() else {
            return;
        };
        match heartbeat.tick(Instant::now()) {
            HeartbeatTick::Send => self.send_heartbeat().await,
            HeartbeatTick::Zombie => {
                tracing::warn!(
                    interval_ms = heartbeat.interval().as_millis() as u64,
                    "Heartbeat not acknowledged; connection is a zombie"
                );
                self.on_connection_lost(RESUMABLE_CLOSURE, None).await;
            }
        }
    }

    async fn send_heartbeat(&mut self) {
        self.send(GatewayMessage::heartbeat(self.session.sequence())).await;
    }

    async fn send_identify(&mut self) {
        let payload = IdentifyPayload {
            token: self.config.token.clone(),
            intents: self.config.intents,
            properties: self.config.properties.clone(),
        };
        match GatewayMessage::identify(&payload) {
            Ok(message) => {
                tracing::info!(intents = payload.intents.bits(), "Sending Identify");
                self.send(message).await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode Identify"),
        }
    }

    /// Resume if the session allows it, otherwise fall back to Identify
    async fn send_resume(&mut self) {
        let Some(payload) = self.session.resume_payload(&self.config.token) else {
            tracing::debug!("No resumable session; identifying instead");
            self.send_identify().await;
            return;
        };
        match GatewayMessage::resume(&payload) {
            Ok(message) => {
                tracing::info!(session_id = %payload.session_id, seq = payload.seq, "Sending Resume");
                self.send(message).await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode Resume"),
        }
    }

    async fn send(&mut self, message: GatewayMessage) {
        let Some(sink) = self.sink.as_mut() else {
            tracing::debug!(op = %message.op, "No open socket; dropping frame");
            return;
        };
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(op = %message.op, error = %e, "Failed to encode frame");
                return;
            }
        };
        if let Err(e) = sink.send(json).await {
            // The reader reports the close that follows a dead socket
            tracing::warn!(op = %message.op, error = %e, "Failed to send frame");
        }
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    fn clear_timers(&mut self) {
        self.heartbeat = None;
        self.reconnect_at = None;
        self.handshake_deadline = None;
        self.reauth = None;
    }

    fn report_violation(&mut self, detail: String) {
        let error = GatewayError::ProtocolViolation(detail);
        tracing::warn!(error = %error, "Dropping frame");
        self.emit(SystemEvent::Error(error.to_string()));
    }

    /// Reply to a waiting `connect()`, publishing first so the caller sees the new state
    fn answer_connect(&mut self, result: GatewayResult<SessionInfo>) {
        if let Some(reply) = self.pending_connect.take() {
            self.publish();
            let _ = reply.send(result);
        }
    }

    fn emit(&self, event: SystemEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Listener dispatcher gone; event dropped");
        }
    }

    fn publish(&self) {
        let snapshot = ConnectionSnapshot {
            state: self.state,
            session_id: self.session.session_id().map(str::to_string),
            sequence: self.session.sequence(),
            heartbeat_armed: self.heartbeat.is_some(),
            reconnect_pending: self.reconnect_at.is_some(),
            handshake_pending: self.handshake_deadline.is_some(),
            reauth_pending: self.reauth.is_some(),
            transport_open: self.sink.is_some(),
            transport_opening: self.opening.is_some(),
        };
        self.snapshot.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

/// Outcome of the socket open in flight, or never if none is
async fn next_open_result(opening: &mut Option<PendingOpen>) -> GatewayResult<TransportConnection> {
    match opening {
        Some(open) => open.await,
        None => std::future::pending().await,
    }
}

/// Next event from the socket, or never if there is no socket
///
/// A reader that vanishes without reporting a close counts as an abnormal closure.
async fn next_transport_event(inbound: &mut Option<mpsc::Receiver<TransportEvent>>) -> TransportEvent {
    match inbound {
        Some(events) => events
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed(ABNORMAL_CLOSURE)),
        None => std::future::pending().await,
    }
}

/// Sleep until the deadline, or forever if none is armed
async fn sleep_until_armed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
