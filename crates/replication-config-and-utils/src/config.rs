//! Configuration management for the daemon.

use crate::{SettingsError, SettingsResult, Paths};
use replication_core::ReplicationInstance;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// URI the local instance announces itself with when none is configured.
pub const DEFAULT_INSTANCE_URI: &str = "http://127.0.0.1:8080";

/// Environment variable overriding `log_level`.
pub const ENV_LOG_LEVEL: &str = "REPLICATION_LOG_LEVEL";

/// Main daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// This instance, as peers know it.
    #[serde(default = "default_instance")]
    pub instance: ReplicationInstance,
    /// Instances messages are replicated to.
    #[serde(default)]
    pub peers: Vec<ReplicationInstance>,
    #[serde(default)]
    pub sender: SenderSettings,
    #[serde(default)]
    pub transport: TransportSettings,
}

/// Sender pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    pub store_queue_capacity: usize,
    pub send_queue_capacity: usize,
    pub shutdown_timeout_secs: u64,
    /// Delay before a failed delivery is retried, 0 to retry immediately.
    pub retry_delay_ms: u64,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            store_queue_capacity: 1000,
            send_queue_capacity: 1000,
            shutdown_timeout_secs: 60,
            retry_delay_ms: 1000,
        }
    }
}

impl SenderSettings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl TransportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_instance() -> ReplicationInstance {
    ReplicationInstance::new("local", DEFAULT_INSTANCE_URI)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            instance: default_instance(),
            peers: Vec::new(),
            sender: SenderSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from a file, falling back to defaults.
    pub fn load(paths: &Paths) -> SettingsResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> SettingsResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Checks URIs and queue sizes.
    ///
    /// Every URI must parse, peers must be unique and must not include the
    /// local instance.
    pub fn validate(&self) -> SettingsResult<()> {
        Url::parse(&self.instance.uri)?;

        let mut seen = HashSet::new();
        for peer in &self.peers {
            Url::parse(&peer.uri)?;
            if peer.uri == self.instance.uri {
                return Err(SettingsError::Config(format!(
                    "Peer [{}] is the local instance",
                    peer.uri
                )));
            }
            if !seen.insert(peer.uri.as_str()) {
                return Err(SettingsError::Config(format!(
                    "Peer [{}] is listed more than once",
                    peer.uri
                )));
            }
        }

        if self.sender.store_queue_capacity == 0 || self.sender.send_queue_capacity == 0 {
            return Err(SettingsError::Config(
                "Queue capacities must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Override configuration from environment variables.
    /// Only log_level can be overridden at runtime.
    fn load_from_env(&mut self) {
        self.apply_log_level_override(std::env::var(ENV_LOG_LEVEL).ok());
    }

    fn apply_log_level_override(&mut self, log_level: Option<String>) {
        if let Some(log_level) = log_level.filter(|l| !l.trim().is_empty()) {
            self.log_level = log_level;
        }
    }
}
