//! Send stage: delivers stored messages to each of their targets.

use crate::queue::PendingDelivery;
use replication_core::{
    InstanceRegistry, MessageEvent, MessageEventSink, MessageStatus, ReplicationInstance,
    SenderMessage, Transport,
};
use replication_message_store::MessageStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

pub(crate) struct SendStage {
    pub store: Arc<dyn MessageStore>,
    pub transport: Arc<dyn Transport>,
    pub instances: Arc<dyn InstanceRegistry>,
    pub events: Arc<dyn MessageEventSink>,
    /// Handle on its own queue, used to re-inject failed deliveries.
    pub queue: mpsc::Sender<PendingDelivery>,
    pub retry_delay: Duration,
}

impl SendStage {
    pub async fn run(self, mut queue: mpsc::Receiver<PendingDelivery>) {
        while let Some(delivery) = queue.recv().await {
            for target in &delivery.targets {
                let registered = delivery.was_registered(&target.uri);
                self.deliver(&delivery.message, target, registered).await;
            }
        }

        info!("Send stage stopped");
    }

    /// Sends to one target. A failure is retried unless the target was
    /// registered and has been removed since.
    async fn deliver(
        &self,
        message: &Arc<SenderMessage>,
        target: &ReplicationInstance,
        registered: bool,
    ) {
        match self.transport.send_message(message, target).await {
            Ok(()) => {
                debug!(message_id = %message.id, target = %target.uri, "Message sent");
                self.events.emit(MessageEvent::outbound(
                    MessageStatus::Sent,
                    message,
                    Some(target),
                ));
                self.forget_target(message, target);
            }
            Err(e) => {
                if registered && !self.instances.contains(&target.uri) {
                    warn!(
                        message_id = %message.id,
                        target = %target.uri,
                        error = %e,
                        "Failed to send message to an instance that is no longer registered, dropping it"
                    );
                    self.forget_target(message, target);
                    return;
                }

                error!(
                    message_id = %message.id,
                    target = %target.uri,
                    error = %e,
                    "Failed to send message, reinjecting it in the queue"
                );
                self.reinject(PendingDelivery::single(
                    message.clone(),
                    target.clone(),
                    registered,
                ));
            }
        }
    }

    fn forget_target(&self, message: &SenderMessage, target: &ReplicationInstance) {
        if let Err(e) = self.store.remove_target(&message.id, target) {
            warn!(
                message_id = %message.id,
                target = %target.uri,
                error = %e,
                "Failed to remove sent message target from the store"
            );
        }
    }

    /// Puts a delivery back at the tail of the send queue.
    ///
    /// Never waits on the queue from the worker itself: when the queue is full
    /// (or a retry delay is configured) a task waits on its behalf.
    fn reinject(&self, delivery: PendingDelivery) {
        if self.retry_delay.is_zero() {
            match self.queue.try_send(delivery) {
                Ok(()) => {}
                Err(TrySendError::Full(delivery)) => {
                    let queue = self.queue.clone();
                    tokio::spawn(async move {
                        if let Err(e) = queue.send(delivery).await {
                            debug!(message_id = %e.0.message.id, "Send queue closed, retry left to next startup");
                        }
                    });
                }
                Err(TrySendError::Closed(delivery)) => {
                    debug!(message_id = %delivery.message.id, "Send queue closed, retry left to next startup");
                }
            }
            return;
        }

        let queue = self.queue.clone();
        let delay = self.retry_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = queue.send(delivery).await {
                debug!(message_id = %e.0.message.id, "Send queue closed, retry left to next startup");
            }
        });
    }
}
