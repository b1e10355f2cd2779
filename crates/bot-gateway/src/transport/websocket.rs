//! `tokio-tungstenite` transport

use super::{FrameSink, Transport, TransportConnection, TransportEvent};
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::ABNORMAL_CLOSURE;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Code reported when a close frame carries no status
const NO_STATUS_RECEIVED: u16 = 1005;

/// Channel buffer size for inbound events
const EVENT_BUFFER_SIZE: usize = 256;

/// WebSocket transport backed by `tokio-tungstenite`
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> GatewayResult<TransportConnection> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        tracing::debug!(url = %url, "WebSocket connection established");

        let (sink, stream) = ws_stream.split();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);

        tokio::spawn(read_loop(stream, tx));

        Ok(TransportConnection {
            sink: Box::new(WebSocketSink { sink }),
            events: rx,
        })
    }
}

/// Forward inbound frames until the socket ends, then report the close code
async fn read_loop(mut stream: SplitStream<WsStream>, tx: mpsc::Sender<TransportEvent>) {
    let code = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                if tx.send(TransportEvent::Message(text.to_string())).await.is_err() {
                    // Receiver dropped: the manager moved on to another socket
                    return;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                break frame.map_or(NO_STATUS_RECEIVED, |f| f.code.into());
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!("Ignoring binary frame; gateway encoding is JSON");
            }
            Some(Ok(_)) => {
                // Ping/pong are answered by tungstenite
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "WebSocket read error");
                let _ = tx.send(TransportEvent::Error(e.to_string())).await;
                break ABNORMAL_CLOSURE;
            }
            None => break ABNORMAL_CLOSURE,
        }
    };

    let _ = tx.send(TransportEvent::Closed(code)).await;
}

struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code),
            reason: "".into(),
        };
        self.sink
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        // The peer may already be gone; the close frame is best effort
        let _ = self.sink.close().await;
        Ok(())
    }
}
