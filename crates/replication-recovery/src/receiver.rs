//! Receiver of `instance_recover_request` messages.

use crate::{RecoverHandler, RecoverHandlerProvider};
use async_trait::async_trait;
use replication_core::recover::{recover_finished, RecoverWindow};
use replication_core::{MessageReceiver, MessageSender, ReceiverMessage, ReplicationResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs every recovery handler for the requested window, then notifies the
/// requester.
///
/// The first failing handler aborts the request: later handlers do not run
/// and no completion notice is sent. The requester is expected to ask again.
pub struct InstanceRecoverRequestReceiver {
    handlers: Arc<dyn RecoverHandlerProvider>,
    sender: Arc<dyn MessageSender>,
}

impl InstanceRecoverRequestReceiver {
    pub fn new(handlers: Arc<dyn RecoverHandlerProvider>, sender: Arc<dyn MessageSender>) -> Self {
        Self { handlers, sender }
    }
}

#[async_trait]
impl MessageReceiver for InstanceRecoverRequestReceiver {
    async fn receive(&self, message: &ReceiverMessage) -> ReplicationResult<()> {
        let mut handlers: Vec<Arc<dyn RecoverHandler>> = self.handlers.handlers()?;
        handlers.sort_by_key(|h| h.priority());

        let window = RecoverWindow::from_message(message)?;

        info!(
            message_id = %message.id,
            sender = %message.sender,
            date_min = %window.date_min,
            date_max = %window.date_max,
            handlers = handlers.len(),
            "Recovering messages for instance"
        );

        for handler in &handlers {
            debug!(
                handler = handler.name(),
                priority = handler.priority(),
                "Running recovery handler"
            );
            if let Err(e) = handler
                .receive(window.date_min, window.date_max, message)
                .await
            {
                error!(
                    message_id = %message.id,
                    handler = handler.name(),
                    error = %e,
                    "Recovery handler failed, aborting recovery"
                );
                return Err(e);
            }
        }

        self.sender.send(recover_finished(window, message)).await
    }
}
