//! Routing of inbound messages to the receiver registered for their type.

use crate::{
    MessageEvent, MessageEventSink, MessageStatus, ReceiverMessage, ReplicationError,
    ReplicationResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handles every inbound message of one type.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    async fn receive(&self, message: &ReceiverMessage) -> ReplicationResult<()>;
}

/// Maps message types to receivers.
pub struct ReceiverRegistry {
    receivers: HashMap<String, Arc<dyn MessageReceiver>>,
    events: Arc<dyn MessageEventSink>,
}

impl ReceiverRegistry {
    pub fn new(events: Arc<dyn MessageEventSink>) -> Self {
        Self {
            receivers: HashMap::new(),
            events,
        }
    }

    /// Registers the receiver of a message type, replacing any previous one.
    pub fn register(&mut self, message_type: impl Into<String>, receiver: Arc<dyn MessageReceiver>) {
        self.receivers.insert(message_type.into(), receiver);
    }

    pub fn is_registered(&self, message_type: &str) -> bool {
        self.receivers.contains_key(message_type)
    }

    /// Routes a message to its receiver.
    ///
    /// Emits `received` before and `handled` after a successful call. Errors
    /// of the receiver are returned as-is.
    pub async fn dispatch(&self, message: &ReceiverMessage) -> ReplicationResult<()> {
        let receiver = match self.receivers.get(&message.message_type) {
            Some(receiver) => receiver.clone(),
            None => {
                warn!(
                    message_id = %message.id,
                    message_type = %message.message_type,
                    "No receiver registered for message type"
                );
                return Err(ReplicationError::InvalidMessage(format!(
                    "Unsupported message type [{}]",
                    message.message_type
                )));
            }
        };

        self.events
            .emit(MessageEvent::inbound(MessageStatus::Received, message));

        receiver.receive(message).await?;

        debug!(message_id = %message.id, message_type = %message.message_type, "Message handled");
        self.events
            .emit(MessageEvent::inbound(MessageStatus::Handled, message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordingSink, SenderMessage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReceiver {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MessageReceiver for CountingReceiver {
        async fn receive(&self, _message: &ReceiverMessage) -> ReplicationResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ReplicationError::Handler("boom".to_string()));
            }
            Ok(())
        }
    }

    fn message(message_type: &str) -> ReceiverMessage {
        ReceiverMessage::from_sender(&SenderMessage::new(message_type), "http://s.local")
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_type() {
        let sink = Arc::new(RecordingSink::new());
        let receiver = Arc::new(CountingReceiver {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let mut registry = ReceiverRegistry::new(sink.clone());
        registry.register("document_update", receiver.clone());

        registry.dispatch(&message("document_update")).await.unwrap();

        assert_eq!(receiver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.with_status(MessageStatus::Received).len(), 1);
        assert_eq!(sink.with_status(MessageStatus::Handled).len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_type() {
        let sink = Arc::new(RecordingSink::new());
        let registry = ReceiverRegistry::new(sink.clone());

        let err = registry.dispatch(&message("unknown")).await.unwrap_err();
        assert!(matches!(err, ReplicationError::InvalidMessage(_)));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_not_handled() {
        let sink = Arc::new(RecordingSink::new());
        let mut registry = ReceiverRegistry::new(sink.clone());
        registry.register(
            "t",
            Arc::new(CountingReceiver {
                calls: AtomicUsize::new(0),
                fail: true,
            }),
        );

        assert!(registry.dispatch(&message("t")).await.is_err());
        assert_eq!(sink.with_status(MessageStatus::Received).len(), 1);
        assert!(sink.with_status(MessageStatus::Handled).is_empty());
    }
}
