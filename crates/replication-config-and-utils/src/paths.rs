//! File system paths for the daemon.

use crate::{SettingsError, SettingsResult};
use std::path::PathBuf;

/// Manages file system paths for the daemon.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for daemon files (~/.replication)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.replication`.
    pub fn new() -> SettingsResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SettingsError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".replication"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.replication).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.replication/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the message store path (~/.replication/replication.sqlite).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("replication.sqlite")
    }

    /// Get the PID file path (~/.replication/daemon.pid).
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("daemon.pid")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> SettingsResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}
