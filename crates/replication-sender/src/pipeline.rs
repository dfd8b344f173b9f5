//! The replication sender: intake, worker lifecycle and shutdown.

use crate::persist::PersistStage;
use crate::queue::{PendingDelivery, StoreQueueEntry};
use crate::send::SendStage;
use crate::SenderConfig;
use async_trait::async_trait;
use replication_core::{
    InstanceRegistry, MessageEventSink, MessageId, MessageSender, ReplicationError,
    ReplicationInstance, ReplicationResult, SenderMessage, Transport,
};
use replication_message_store::MessageStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How a shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The persist stage processed everything queued before it and exited.
    Drained,
    /// The persist stage did not exit in time (or crashed) and was cancelled.
    Cancelled,
    /// Shutdown had already been performed.
    AlreadyStopped,
}

/// Approximate depth of the pipeline queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    /// Entries waiting to be persisted.
    pub store_pending: usize,
    /// Entries waiting to be sent (including retries).
    pub send_pending: usize,
}

struct Workers {
    persist: JoinHandle<()>,
    send: JoinHandle<()>,
}

/// Outbound delivery pipeline.
///
/// Owns two workers: the persist stage and the send stage, each consuming
/// one bounded queue. See the crate documentation for the data flow.
///
/// # Lifecycle
///
/// 1. [`ReplicationSender::start()`] reloads stored records and spawns the workers
/// 2. [`ReplicationSender::enqueue()`] / [`ReplicationSender::enqueue_to()`] submit messages
/// 3. [`ReplicationSender::shutdown()`] drains the persist stage and stops
pub struct ReplicationSender {
    config: SenderConfig,
    store_queue: mpsc::Sender<StoreQueueEntry>,
    send_queue: mpsc::Sender<PendingDelivery>,
    closed: AtomicBool,
    workers: Mutex<Option<Workers>>,
}

impl ReplicationSender {
    /// Starts the pipeline.
    ///
    /// Every record found in `store` is queued for sending with its stored
    /// targets before this returns, so they are ahead of any new submission.
    /// A store that cannot be read is logged and treated as empty.
    pub async fn start(
        config: SenderConfig,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn Transport>,
        instances: Arc<dyn InstanceRegistry>,
        events: Arc<dyn MessageEventSink>,
    ) -> Self {
        let (store_tx, store_rx) = mpsc::channel(config.store_queue_capacity.max(1));
        let (send_tx, send_rx) = mpsc::channel(config.send_queue_capacity.max(1));

        let send_stage = SendStage {
            store: store.clone(),
            transport,
            instances: instances.clone(),
            events: events.clone(),
            queue: send_tx.clone(),
            retry_delay: config.retry_delay,
        };
        let send = tokio::spawn(send_stage.run(send_rx));

        reload(store.as_ref(), instances.as_ref(), &send_tx).await;

        let persist_stage = PersistStage {
            store,
            instances,
            events,
            send_queue: send_tx.clone(),
        };
        let persist = tokio::spawn(persist_stage.run(store_rx));

        info!(
            store_queue_capacity = config.store_queue_capacity,
            send_queue_capacity = config.send_queue_capacity,
            "Replication sender started"
        );

        Self {
            config,
            store_queue: store_tx,
            send_queue: send_tx,
            closed: AtomicBool::new(false),
            workers: Mutex::new(Some(Workers { persist, send })),
        }
    }

    /// Queues a message for every instance known when it gets persisted.
    ///
    /// Waits while the store queue is full. Dropping the returned future while
    /// it waits cancels the submission.
    pub async fn enqueue(&self, message: SenderMessage) -> ReplicationResult<MessageId> {
        self.enqueue_to(message, Vec::new()).await
    }

    /// Queues a message for the given targets. Empty targets means all instances.
    pub async fn enqueue_to(
        &self,
        message: SenderMessage,
        targets: Vec<ReplicationInstance>,
    ) -> ReplicationResult<MessageId> {
        let id = message.id.clone();

        if self.closed.load(Ordering::SeqCst) {
            return Err(ReplicationError::Queueing(format!(
                "Failed to queue message [{}]: the sender is shut down",
                id
            )));
        }

        let delivery = PendingDelivery::new(Arc::new(message), targets);
        self.store_queue
            .send(StoreQueueEntry::Deliver(delivery))
            .await
            .map_err(|_| {
                ReplicationError::Queueing(format!(
                    "Failed to queue message [{}]: the persist stage is stopped",
                    id
                ))
            })?;

        Ok(id)
    }

    /// Approximate number of entries waiting in each queue.
    pub fn queue_status(&self) -> QueueStatus {
        QueueStatus {
            store_pending: self.store_queue.max_capacity() - self.store_queue.capacity(),
            send_pending: self.send_queue.max_capacity() - self.send_queue.capacity(),
        }
    }

    /// Whether shutdown has started.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops the pipeline.
    ///
    /// New submissions fail from now on. The persist stage gets
    /// `shutdown_timeout` to persist what it was given and is cancelled past
    /// it. The send stage is stopped without waiting: whatever it had not
    /// sent yet is on disk and reloaded on next start.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        self.closed.store(true, Ordering::SeqCst);

        let Some(Workers { mut persist, send }) = self.workers.lock().await.take() else {
            return ShutdownOutcome::AlreadyStopped;
        };

        info!("Stopping replication sender");

        let store_queue = self.store_queue.clone();
        let drained = tokio::time::timeout(self.config.shutdown_timeout, async {
            // a closed queue means the stage already exited
            let _ = store_queue.send(StoreQueueEntry::Stop).await;
            (&mut persist).await
        })
        .await;

        let outcome = match drained {
            Ok(Ok(())) => ShutdownOutcome::Drained,
            Ok(Err(e)) => {
                error!(error = %e, "Persist stage terminated abnormally");
                ShutdownOutcome::Cancelled
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.shutdown_timeout.as_secs_f64(),
                    "The persist stage is still running, cancelling it"
                );
                persist.abort();
                ShutdownOutcome::Cancelled
            }
        };

        send.abort();

        info!(outcome = ?outcome, "Replication sender stopped");
        outcome
    }
}

impl Drop for ReplicationSender {
    fn drop(&mut self) {
        // The persist stage ends by itself once the store queue sender is gone.
        if let Ok(mut workers) = self.workers.try_lock() {
            if let Some(workers) = workers.take() {
                workers.send.abort();
            }
        }
    }
}

#[async_trait]
impl MessageSender for ReplicationSender {
    async fn send(&self, message: SenderMessage) -> ReplicationResult<()> {
        self.enqueue(message).await.map(|_| ())
    }

    async fn send_to(
        &self,
        message: SenderMessage,
        targets: Vec<ReplicationInstance>,
    ) -> ReplicationResult<()> {
        self.enqueue_to(message, targets).await.map(|_| ())
    }
}

/// Queues every stored record for sending, with its stored targets.
async fn reload(
    store: &dyn MessageStore,
    instances: &dyn InstanceRegistry,
    send_queue: &mpsc::Sender<PendingDelivery>,
) {
    let records = match store.load_all() {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to load stored messages, previous queue is not resumed");
            return;
        }
    };

    if records.is_empty() {
        return;
    }

    info!(count = records.len(), "Resuming delivery of stored messages");

    for record in records {
        let delivery =
            PendingDelivery::tracked(Arc::new(record.message), record.targets, instances);
        if send_queue.send(delivery).await.is_err() {
            warn!("Send stage is gone, stopping reload");
            break;
        }
    }
}
