//! Error types for the hub core.

use thiserror::Error;

/// Errors surfaced by the hub core. None of these are fatal to a running hub:
/// transport failures tear down the offending session, bus failures are
/// logged and retried or dropped, and everything else is a benign no-op.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigLoadError),

    #[error("Bus error: {0}")]
    Bus(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hub closed")]
    HubClosed,

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type HubResult<T> = Result<T, HubError>;
