//! Peer instances and the registry that knows them.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// A peer instance messages are exchanged with.
///
/// The URI is the identity: two instances with the same URI are the same
/// peer, whatever their display name.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ReplicationInstance {
    /// Human readable name, used in logs.
    pub name: String,
    /// Base URI of the peer.
    pub uri: String,
}

impl ReplicationInstance {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }

    /// Returns the identity of the instance.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for ReplicationInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.uri)
    }
}

/// Resolves the current set of peer instances.
pub trait InstanceRegistry: Send + Sync {
    /// Snapshot of every currently known peer.
    fn instances(&self) -> Vec<ReplicationInstance>;

    /// Whether a peer with this URI is currently known.
    fn contains(&self, uri: &str) -> bool {
        self.instances().iter().any(|i| i.uri == uri)
    }
}

/// In-memory registry backed by a fixed list that can be edited at runtime.
#[derive(Debug, Default)]
pub struct StaticInstanceRegistry {
    instances: RwLock<Vec<ReplicationInstance>>,
}

impl StaticInstanceRegistry {
    pub fn new(instances: Vec<ReplicationInstance>) -> Self {
        Self {
            instances: RwLock::new(instances),
        }
    }

    /// Adds a peer, replacing any existing entry with the same URI.
    pub fn add(&self, instance: ReplicationInstance) {
        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        instances.retain(|i| i.uri != instance.uri);
        instances.push(instance);
    }

    /// Removes a peer. Returns true if it was known.
    pub fn remove(&self, uri: &str) -> bool {
        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        let before = instances.len();
        instances.retain(|i| i.uri != uri);
        instances.len() != before
    }
}

impl InstanceRegistry for StaticInstanceRegistry {
    fn instances(&self) -> Vec<ReplicationInstance> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
