//! Persist stage: makes queued messages durable before they are sent.

use crate::queue::{PendingDelivery, StoreQueueEntry};
use replication_core::{InstanceRegistry, MessageEvent, MessageEventSink, MessageStatus};
use replication_message_store::MessageStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub(crate) struct PersistStage {
    pub store: Arc<dyn MessageStore>,
    pub instances: Arc<dyn InstanceRegistry>,
    pub events: Arc<dyn MessageEventSink>,
    pub send_queue: mpsc::Sender<PendingDelivery>,
}

impl PersistStage {
    /// Runs until the poison pill is received or every submitter is gone.
    ///
    /// On the pill the queue is closed, so later submissions fail, and
    /// whatever was already buffered is still persisted.
    pub async fn run(self, mut queue: mpsc::Receiver<StoreQueueEntry>) {
        while let Some(entry) = queue.recv().await {
            match entry {
                StoreQueueEntry::Deliver(delivery) => self.persist(delivery).await,
                StoreQueueEntry::Stop => {
                    debug!("Persist stage received stop, draining");
                    queue.close();
                    while let Some(entry) = queue.recv().await {
                        if let StoreQueueEntry::Deliver(delivery) = entry {
                            self.persist(delivery).await;
                        }
                    }
                    break;
                }
            }
        }

        info!("Persist stage stopped");
    }

    async fn persist(&self, delivery: PendingDelivery) {
        let PendingDelivery {
            message, targets, ..
        } = delivery;

        let targets = if targets.is_empty() {
            self.instances.instances()
        } else {
            targets
        };

        if targets.is_empty() {
            warn!(message_id = %message.id, "No instance to send the message to, dropping it");
            return;
        }

        let targets = match self.store.write_record(&message, &targets) {
            Ok(record) => {
                for target in &record.targets {
                    self.events.emit(MessageEvent::outbound(
                        MessageStatus::Stored,
                        &message,
                        Some(target),
                    ));
                }
                record.targets
            }
            Err(e) => {
                error!(
                    message_id = %message.id,
                    error = %e,
                    "Failed to store the message on disk, it might be lost if it cannot be sent before next restart"
                );
                targets
            }
        };

        debug!(message_id = %message.id, targets = targets.len(), "Message ready to send");

        if self
            .send_queue
            .send(PendingDelivery::tracked(
                message,
                targets,
                self.instances.as_ref(),
            ))
            .await
            .is_err()
        {
            warn!("Send stage is gone, message stays on disk for next startup");
        }
    }
}
