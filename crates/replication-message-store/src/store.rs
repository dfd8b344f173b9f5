//! Message store contract.

use crate::StoreResult;
use replication_core::{MessageId, ReplicationInstance, SenderMessage};
use std::collections::HashSet;

/// On-disk projection of a message waiting for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMessageRecord {
    pub message: SenderMessage,
    /// Instances that have not been sent the message yet. Never empty.
    pub targets: Vec<ReplicationInstance>,
}

/// Storage of messages that still have targets to reach.
///
/// Implementations must keep every record update atomic with respect to
/// concurrent readers.
pub trait MessageStore: Send + Sync {
    /// Persists a message and the targets it must reach.
    ///
    /// Targets are normalized (see [`normalize_targets`]) and the returned
    /// record carries the normalized list. Writing an id that already exists
    /// replaces its targets.
    fn write_record(
        &self,
        message: &SenderMessage,
        targets: &[ReplicationInstance],
    ) -> StoreResult<StoredMessageRecord>;

    /// Every stored record, oldest first.
    fn load_all(&self) -> StoreResult<Vec<StoredMessageRecord>>;

    /// Removes one target of a message, deleting the record with its last target.
    ///
    /// Removing an absent target, or a target of an unknown message, is a no-op.
    fn remove_target(&self, message_id: &MessageId, target: &ReplicationInstance)
        -> StoreResult<()>;

    /// Number of stored records.
    fn count(&self) -> StoreResult<usize>;
}

/// Dedupes targets by URI, keeping the first occurrence of each.
pub fn normalize_targets(targets: &[ReplicationInstance]) -> Vec<ReplicationInstance> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| seen.insert(t.uri.as_str()))
        .cloned()
        .collect()
}
