//! Collaborator traits at the delivery boundary.

use crate::{ReplicationInstance, ReplicationResult, SenderMessage, TransportError};
use async_trait::async_trait;
use std::sync::Arc;

/// Performs one send attempt of one message to one target.
///
/// Any error is considered transient: the pipeline retries it forever.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(
        &self,
        message: &SenderMessage,
        target: &ReplicationInstance,
    ) -> Result<(), TransportError>;
}

/// Intake of the outbound delivery pipeline.
///
/// Both calls return once the message has been accepted for delivery, not
/// once it has been delivered.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Queues a message for every instance known at persistence time.
    async fn send(&self, message: SenderMessage) -> ReplicationResult<()>;

    /// Queues a message for an explicit set of targets (empty means all).
    async fn send_to(
        &self,
        message: SenderMessage,
        targets: Vec<ReplicationInstance>,
    ) -> ReplicationResult<()>;
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send(&self, message: SenderMessage) -> ReplicationResult<()> {
        (**self).send(message).await
    }

    async fn send_to(
        &self,
        message: SenderMessage,
        targets: Vec<ReplicationInstance>,
    ) -> ReplicationResult<()> {
        (**self).send_to(message, targets).await
    }
}
