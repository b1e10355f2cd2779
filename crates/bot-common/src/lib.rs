//! # bot-common
//!
//! Shared utilities including configuration loading and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    BotConfig, ClientIdentity, ConfigError, Environment, GatewaySettings, JitterSettings,
};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
