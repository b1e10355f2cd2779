//! Gateway client configuration

use crate::connection::JitterRange;
use crate::protocol::{IdentifyProperties, Intents};
use bot_common::BotConfig;
use std::time::Duration;

/// Default gateway endpoint (API v10, JSON encoding)
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Default wait for READY/RESUMED after the socket opens
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the connection manager needs to reach and authenticate with the gateway
#[derive(Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub token: String,
    pub intents: Intents,
    pub properties: IdentifyProperties,
    pub handshake_timeout: Duration,
    pub reconnect_jitter: JitterRange,
    pub invalid_session_jitter: JitterRange,
}

impl GatewayConfig {
    /// Config with default intents, properties, timeout and jitter ranges
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            intents: Intents::default(),
            properties: IdentifyProperties::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reconnect_jitter: JitterRange::reconnect(),
            invalid_session_jitter: JitterRange::invalid_session(),
        }
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect_jitter(mut self, jitter: JitterRange) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    #[must_use]
    pub fn with_invalid_session_jitter(mut self, jitter: JitterRange) -> Self {
        self.invalid_session_jitter = jitter;
        self
    }
}

impl From<&BotConfig> for GatewayConfig {
    fn from(config: &BotConfig) -> Self {
        let gateway = &config.gateway;
        let properties = IdentifyProperties::default()
            .with_os(config.identity.os.clone())
            .with_browser(config.identity.browser.clone())
            .with_device(config.identity.device.clone());

        Self::new(gateway.url.clone(), gateway.token.clone())
            .with_intents(Intents::from_bits_retain(gateway.intents))
            .with_properties(properties)
            .with_handshake_timeout(Duration::from_secs(gateway.handshake_timeout_secs))
            .with_reconnect_jitter(JitterRange::from_millis(
                gateway.reconnect_jitter.min_ms,
                gateway.reconnect_jitter.max_ms,
            ))
            .with_invalid_session_jitter(JitterRange::from_millis(
                gateway.invalid_session_jitter.min_ms,
                gateway.invalid_session_jitter.max_ms,
            ))
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("reconnect_jitter", &self.reconnect_jitter)
            .field("invalid_session_jitter", &self.invalid_session_jitter)
            .finish()
    }
}
