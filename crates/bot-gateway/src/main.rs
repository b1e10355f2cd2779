//! Mention bot entry point
//!
//! Run with:
//! ```bash
//! cargo run -p bot-gateway --bin mention-bot
//! ```
//!
//! Configuration is loaded from environment variables.

use bot_common::{try_init_tracing_with_config, BotConfig, TracingConfig};
use bot_gateway::events::{GatewayEventType, MessageCreateEvent};
use bot_gateway::{
    DispatchEvent, GatewayClient, GatewayConfig, GatewayResult, SessionInfo, SystemEvent,
    SystemEventKind,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Attempts at the first connect before giving up
const CONNECT_ATTEMPTS: u32 = 5;

/// Pause between failed first connects
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    // Load configuration before tracing so the environment picks the log format
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Mention bot stopped");
        std::process::exit(1);
    }
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    info!(env = ?config.env, gateway = ?config.gateway, "Starting mention bot");

    let client = GatewayClient::new(GatewayConfig::from(&config));
    let bot_id: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));

    let ready_id = bot_id.clone();
    client.on(SystemEventKind::Connected, move |event| {
        if let SystemEvent::Connected(info) = event {
            if let Some(user) = &info.user {
                info!(user = %user.tag(), session_id = %info.session_id, "Logged in");
                *ready_id.write() = Some(user.id.clone());
            }
        }
    });
    client.on(SystemEventKind::Disconnected, |event| {
        if let SystemEvent::Disconnected { code, reconnecting } = event {
            warn!(code, reconnecting, "Gateway disconnected");
        }
    });

    let mention_id = bot_id.clone();
    client.on_event(
        GatewayEventType::MessageCreate.as_str(),
        move |event: &DispatchEvent| -> anyhow::Result<()> {
            let message: MessageCreateEvent = event.payload()?;
            let Some(me) = mention_id.read().clone() else {
                return Ok(());
            };
            if message.author.id != me && message.mentions_user(&me) {
                info!(
                    channel_id = %message.channel_id,
                    author = %message.author.tag(),
                    content = %message.content_without_mention(&me),
                    "Mentioned"
                );
            }
            Ok(())
        },
    );

    let session = connect_with_retry(&client).await?;
    info!(session_id = %session.session_id, "Gateway session established");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    client.disconnect().await;

    Ok(())
}

/// Connect, retrying failures that a later attempt may get past
///
/// Once connected the client recovers on its own; only the first handshake is retried here.
async fn connect_with_retry(client: &GatewayClient) -> GatewayResult<SessionInfo> {
    let mut attempt = 1;
    loop {
        match client.connect().await {
            Ok(session) => return Ok(session),
            Err(e) if e.is_retryable() && attempt < CONNECT_ATTEMPTS => {
                warn!(
                    attempt,
                    error = %e,
                    retry_in_secs = CONNECT_RETRY_DELAY.as_secs(),
                    "Connect failed; retrying"
                );
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
