//! Configuration loading and management.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration.
///
/// All values are tunables, not behavioral contracts: deployments are free
/// to change retry pacing and the saved-partner cap without affecting
/// correctness.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Matchmaking retry behavior.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Save/reconnect handshake limits.
    #[serde(default)]
    pub handshake: HandshakeConfig,
    /// Directory database configuration.
    pub database: Option<DatabaseConfig>,
}

/// Matchmaking retry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Seconds between automatic pairing re-attempts for a waiting user.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    /// Maximum number of re-attempts before the search gives up.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Emit a "still searching" notice every N failed attempts (0 disables).
    #[serde(default = "default_searching_notice_every")]
    pub searching_notice_every: u32,
}

/// Handshake configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HandshakeConfig {
    /// Maximum saved pairings per user, enforced on both sides at accept.
    #[serde(default = "default_saved_pairing_cap")]
    pub saved_pairing_cap: u32,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (`:memory:` for an in-memory database).
    pub path: String,
}

fn default_retry_interval_secs() -> u64 {
    10
}

fn default_max_retry_attempts() -> u32 {
    12
}

fn default_searching_notice_every() -> u32 {
    3
}

fn default_saved_pairing_cap() -> u32 {
    3
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: default_retry_interval_secs(),
            max_retry_attempts: default_max_retry_attempts(),
            searching_notice_every: default_searching_notice_every(),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            saved_pairing_cap: default_saved_pairing_cap(),
        }
    }
}

impl MatchingConfig {
    /// Interval between retry ticks.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.matching.retry_interval_secs, 10);
        assert_eq!(config.matching.max_retry_attempts, 12);
        assert_eq!(config.matching.searching_notice_every, 3);
        assert_eq!(config.handshake.saved_pairing_cap, 3);
        assert!(config.database.is_none());
    }

    #[test]
    fn partial_section_fills_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [matching]
            retry_interval_secs = 5

            [database]
            path = ":memory:"
            "#,
        )
        .expect("config should parse");
        assert_eq!(config.matching.retry_interval_secs, 5);
        assert_eq!(config.matching.max_retry_attempts, 12);
        assert_eq!(config.database.unwrap().path, ":memory:");
    }
}
