//! Hub configuration loaded from environment.

use std::str::FromStr;

/// What the hub actor does when a session's outbound queue is full during
/// fan-out. The actor never blocks on a slow session either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the message for that session and keep delivering to the rest.
    DropNew,
    /// Tear the slow session down.
    Disconnect,
}

impl FromStr for OverflowPolicy {
    type Err = ConfigLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop-new" => Ok(OverflowPolicy::DropNew),
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            other => Err(ConfigLoadError::InvalidOverflowPolicy(other.to_string())),
        }
    }
}

/// Hub configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Instance name (e.g. `chathub-1`), interpolated into connect/disconnect notices.
    pub server_name: String,
    /// Redis connection URL (e.g. `redis://127.0.0.1/`).
    pub redis_url: String,
    /// Per-session outbound queue depth.
    pub session_queue_capacity: usize,
    /// Behavior when a session's outbound queue is full.
    pub overflow_policy: OverflowPolicy,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment, with defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let server_name =
            std::env::var("SERVER_NAME").unwrap_or_else(|_| "chathub".to_string());
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());

        let session_queue_capacity = match std::env::var("SESSION_QUEUE_CAPACITY") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|c| *c > 0)
                .ok_or(ConfigLoadError::InvalidQueueCapacity(raw))?,
            Err(_) => 10,
        };

        let overflow_policy = match std::env::var("OVERFLOW_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => OverflowPolicy::DropNew,
        };

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            server_name,
            redis_url,
            session_queue_capacity,
            overflow_policy,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "chathub".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            session_queue_capacity: 10,
            overflow_policy: OverflowPolicy::DropNew,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SESSION_QUEUE_CAPACITY: {0} (expected a positive integer)")]
    InvalidQueueCapacity(String),
    #[error("Invalid OVERFLOW_POLICY: {0} (expected drop-new or disconnect)")]
    InvalidOverflowPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_policy_parses() {
        assert_eq!(
            "drop-new".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::DropNew
        );
        assert_eq!(
            "disconnect".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::Disconnect
        );
        assert!("block".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.session_queue_capacity, 10);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropNew);
    }
}
