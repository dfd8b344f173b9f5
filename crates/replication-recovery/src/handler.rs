//! Recovery handlers and their registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use replication_core::{ReceiverMessage, ReplicationError, ReplicationResult};
use std::sync::{Arc, RwLock};

/// Replays the messages of one kind of data for a recovery window.
#[async_trait]
pub trait RecoverHandler: Send + Sync {
    /// Handlers run in ascending priority order.
    fn priority(&self) -> i32;

    /// Name used in logs.
    fn name(&self) -> &str;

    /// Re-sends whatever changed between `date_min` and `date_max`.
    async fn receive(
        &self,
        date_min: DateTime<Utc>,
        date_max: DateTime<Utc>,
        request: &ReceiverMessage,
    ) -> ReplicationResult<()>;
}

/// Source of the recovery handlers to run for a request.
pub trait RecoverHandlerProvider: Send + Sync {
    fn handlers(&self) -> ReplicationResult<Vec<Arc<dyn RecoverHandler>>>;
}

/// Explicitly populated handler list, kept sorted by priority.
#[derive(Default)]
pub struct RecoverHandlerRegistry {
    handlers: RwLock<Vec<Arc<dyn RecoverHandler>>>,
}

impl RecoverHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler after every handler of lower or equal priority.
    pub fn register(&self, handler: Arc<dyn RecoverHandler>) -> ReplicationResult<()> {
        let mut handlers = self.handlers.write().map_err(|_| poisoned())?;
        let priority = handler.priority();
        let position = handlers.partition_point(|h| h.priority() <= priority);
        handlers.insert(position, handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecoverHandlerProvider for RecoverHandlerRegistry {
    fn handlers(&self) -> ReplicationResult<Vec<Arc<dyn RecoverHandler>>> {
        Ok(self.handlers.read().map_err(|_| poisoned())?.clone())
    }
}

fn poisoned() -> ReplicationError {
    ReplicationError::Configuration("Recovery handler registry is poisoned".to_string())
}
