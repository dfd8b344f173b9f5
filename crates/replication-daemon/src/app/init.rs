//! Daemon run loop.

use super::pipeline::start_pipeline;
use replication_config_and_utils::{Config, Paths};
use replication_message_store::MessageStore;
use std::time::Duration;
use tracing::{info, warn};

/// Interval between two queue status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Run the daemon until Ctrl-C.
pub async fn run_daemon(config: Config, paths: Paths) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    // Clean up stale PID file if it exists
    let pid_file = paths.pid_file();
    if pid_file.exists() {
        let _ = std::fs::remove_file(&pid_file);
    }

    info!(
        instance = %config.instance,
        peers = config.peers.len(),
        "Starting replication daemon"
    );

    if config.peers.is_empty() {
        warn!("No peer configured, messages will be dropped");
    }

    let pipeline = start_pipeline(&config, &paths).await?;

    // Write PID file
    let pid = std::process::id();
    std::fs::write(&pid_file, pid.to_string())?;
    info!(pid = pid, "Daemon started");

    let mut status_tick = tokio::time::interval(STATUS_INTERVAL);
    status_tick.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                info!("Received Ctrl-C, shutting down");
                break;
            }
            _ = status_tick.tick() => {
                let status = pipeline.sender.queue_status();
                let stored = pipeline.store.count().unwrap_or_default();
                info!(
                    store_pending = status.store_pending,
                    send_pending = status.send_pending,
                    stored = stored,
                    "Replication queue status"
                );
            }
        }
    }

    let outcome = pipeline.sender.shutdown().await;

    // Cleanup
    let _ = std::fs::remove_file(&pid_file);

    info!(outcome = ?outcome, "Daemon stopped");
    Ok(())
}
