//! `recover` command: asks peers to replay a time window.

use super::pipeline::start_pipeline;
use replication_config_and_utils::{Config, Paths};
use replication_core::recover::{recover_request, RecoverWindow};
use replication_core::{decode_date, ReplicationInstance};
use replication_sender::ShutdownOutcome;
use tracing::info;

/// Parses the `--from` / `--to` bounds of a recovery window.
pub fn parse_window(from: &str, to: &str) -> Result<RecoverWindow, String> {
    let date_min = decode_date(from).map_err(|e| format!("Invalid --from date [{}]: {}", from, e))?;
    let date_max = decode_date(to).map_err(|e| format!("Invalid --to date [{}]: {}", to, e))?;

    if date_min > date_max {
        return Err(format!("--from [{}] is after --to [{}]", from, to));
    }

    Ok(RecoverWindow::new(date_min, date_max))
}

/// Picks the peers a recovery request goes to. Empty `only` means all peers.
fn select_peers(
    peers: &[ReplicationInstance],
    only: &[String],
) -> Result<Vec<ReplicationInstance>, String> {
    if only.is_empty() {
        return Ok(peers.to_vec());
    }

    only.iter()
        .map(|uri| {
            peers
                .iter()
                .find(|p| &p.uri == uri)
                .cloned()
                .ok_or_else(|| format!("Unknown peer [{}]", uri))
        })
        .collect()
}

/// Queues a recovery request and stops once it is safely on disk.
///
/// Delivery may complete before exit; otherwise the next `start` sends it.
pub async fn request_recovery(
    config: Config,
    paths: Paths,
    window: RecoverWindow,
    only: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let targets = select_peers(&config.peers, &only)?;
    if targets.is_empty() {
        return Err("No peer to recover from".into());
    }

    let pipeline = start_pipeline(&config, &paths).await?;

    let message = recover_request(window, targets.iter().map(|t| t.uri.clone()));
    let id = pipeline.sender.enqueue_to(message, targets.clone()).await?;

    info!(
        message_id = %id,
        date_min = %window.date_min,
        date_max = %window.date_max,
        peers = targets.len(),
        "Recovery requested"
    );

    match pipeline.sender.shutdown().await {
        ShutdownOutcome::Drained => {
            println!("Recovery request {} queued for {} peer(s)", id, targets.len());
            Ok(())
        }
        outcome => Err(format!("Recovery request may not be stored: {:?}", outcome).into()),
    }
}
