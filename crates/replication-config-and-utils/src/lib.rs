//! Configuration, paths and logging for the replication daemon.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, SenderSettings, TransportSettings, DEFAULT_INSTANCE_URI, DEFAULT_LOG_LEVEL,
    ENV_LOG_LEVEL,
};
pub use error::{SettingsError, SettingsResult};
pub use logging::{init_logging, LogFormat, ENV_LOG_FORMAT};
pub use paths::Paths;
