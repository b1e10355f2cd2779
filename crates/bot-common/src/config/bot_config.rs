//! Bot configuration structs
//!
//! Loads configuration from environment variables and an optional `.env` file.

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub env: Environment,
    pub gateway: GatewaySettings,
    pub identity: ClientIdentity,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway connection settings
#[derive(Clone, Deserialize)]
pub struct GatewaySettings {
    /// WebSocket URL of the gateway, including version/encoding query
    pub url: String,
    /// Bot token sent in Identify and Resume
    pub token: String,
    /// Raw intents bitmask
    pub intents: u64,
    /// Seconds to wait for READY/RESUMED after opening the socket
    pub handshake_timeout_secs: u64,
    /// Delay range before reconnecting after an abnormal close
    pub reconnect_jitter: JitterSettings,
    /// Delay range before re-authenticating after INVALID_SESSION
    pub invalid_session_jitter: JitterSettings,
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("handshake_timeout_secs", &self.handshake_timeout_secs)
            .field("reconnect_jitter", &self.reconnect_jitter)
            .field("invalid_session_jitter", &self.invalid_session_jitter)
            .finish()
    }
}

/// Inclusive millisecond bounds for a randomized delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JitterSettings {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Identification properties sent with Identify
#[derive(Debug, Clone, Deserialize)]
pub struct ClientIdentity {
    pub os: String,
    pub browser: String,
    pub device: String,
}

// Default value functions
fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
fn default_intents() -> u64 {
    37_377
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_reconnect_jitter() -> JitterSettings {
    JitterSettings {
        min_ms: 1_000,
        max_ms: 6_000,
    }
}

fn default_invalid_session_jitter() -> JitterSettings {
    JitterSettings {
        min_ms: 2_000,
        max_ms: 5_000,
    }
}

fn default_client_name() -> String {
    "mention-bot".to_string()
}

impl BotConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DISCORD_TOKEN` is missing or a numeric variable is malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;

        let reconnect_jitter = JitterSettings {
            min_ms: parse_or(&lookup, "RECONNECT_JITTER_MIN_MS", default_reconnect_jitter().min_ms)?,
            max_ms: parse_or(&lookup, "RECONNECT_JITTER_MAX_MS", default_reconnect_jitter().max_ms)?,
        };
        check_bounds("RECONNECT_JITTER_MAX_MS", reconnect_jitter)?;

        let invalid_session_jitter = JitterSettings {
            min_ms: parse_or(
                &lookup,
                "INVALID_SESSION_JITTER_MIN_MS",
                default_invalid_session_jitter().min_ms,
            )?,
            max_ms: parse_or(
                &lookup,
                "INVALID_SESSION_JITTER_MAX_MS",
                default_invalid_session_jitter().max_ms,
            )?,
        };
        check_bounds("INVALID_SESSION_JITTER_MAX_MS", invalid_session_jitter)?;

        let env = match lookup("APP_ENV") {
            Some(value) => Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("APP_ENV", value))?,
            None => Environment::default(),
        };

        Ok(Self {
            env,
            gateway: GatewaySettings {
                url: lookup("GATEWAY_URL").unwrap_or_else(default_gateway_url),
                token,
                intents: parse_or(&lookup, "GATEWAY_INTENTS", default_intents())?,
                handshake_timeout_secs: parse_or(
                    &lookup,
                    "HANDSHAKE_TIMEOUT_SECS",
                    default_handshake_timeout(),
                )?,
                reconnect_jitter,
                invalid_session_jitter,
            },
            identity: ClientIdentity {
                os: lookup("CLIENT_OS").unwrap_or_else(|| env::consts::OS.to_string()),
                browser: lookup("CLIENT_BROWSER").unwrap_or_else(default_client_name),
                device: lookup("CLIENT_DEVICE").unwrap_or_else(default_client_name),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

fn check_bounds(key: &'static str, jitter: JitterSettings) -> Result<(), ConfigError> {
    if jitter.max_ms < jitter.min_ms {
        return Err(ConfigError::InvalidValue(
            key,
            format!("{} is below the minimum {}", jitter.max_ms, jitter.min_ms),
        ));
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
