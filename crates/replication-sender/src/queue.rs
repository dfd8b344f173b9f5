//! Entries carried by the pipeline queues.

use replication_core::{InstanceRegistry, ReplicationInstance, SenderMessage};
use std::collections::HashSet;
use std::sync::Arc;

/// A message and the targets it still has to reach.
///
/// The message is shared, never copied: a retry carries the same `Arc` (and
/// so the same id) as the original submission.
#[derive(Clone, Debug)]
pub(crate) struct PendingDelivery {
    pub message: Arc<SenderMessage>,
    /// Empty only in the store queue, where it means "all instances".
    pub targets: Vec<ReplicationInstance>,
    /// URIs of the targets that were in the registry when the delivery was
    /// persisted or reloaded. Only those are dropped once unregistered.
    registered: HashSet<String>,
}

impl PendingDelivery {
    pub fn new(message: Arc<SenderMessage>, targets: Vec<ReplicationInstance>) -> Self {
        Self {
            message,
            targets,
            registered: HashSet::new(),
        }
    }

    /// Entry whose targets are checked against the registry as of now.
    pub fn tracked(
        message: Arc<SenderMessage>,
        targets: Vec<ReplicationInstance>,
        instances: &dyn InstanceRegistry,
    ) -> Self {
        let registered = targets
            .iter()
            .filter(|t| instances.contains(&t.uri))
            .map(|t| t.uri.clone())
            .collect();
        Self {
            message,
            targets,
            registered,
        }
    }

    /// Entry scoped to a single target, used to retry one failed delivery.
    pub fn single(message: Arc<SenderMessage>, target: ReplicationInstance, registered: bool) -> Self {
        let registered = if registered {
            HashSet::from([target.uri.clone()])
        } else {
            HashSet::new()
        };
        Self {
            message,
            targets: vec![target],
            registered,
        }
    }

    pub fn was_registered(&self, uri: &str) -> bool {
        self.registered.contains(uri)
    }
}

/// Store queue entry.
#[derive(Debug)]
pub(crate) enum StoreQueueEntry {
    Deliver(PendingDelivery),
    /// Poison pill: the persist stage drains what is buffered and exits.
    Stop,
}
