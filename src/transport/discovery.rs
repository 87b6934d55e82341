//! Service Discovery
//!
//! Maps a `ReplicaId` to a callable handle. Replica set managers register the
//! nodes they create, unregister them to simulate (or perform) shutdown, and
//! resolve them before every remote call. Resolution of an unregistered
//! replica fails exactly like a dead node.

use super::remote::{RemoteCallError, RemoteNode};
use crate::node::service::StorageNode;
use crate::types::ReplicaId;

use dashmap::DashMap;
use std::sync::Arc;

pub trait ServiceDiscovery: Send + Sync {
    /// Makes `node` reachable under its replica id, replacing any previous binding.
    fn register(&self, node: Arc<StorageNode>);

    /// Removes the binding. Returns `false` if nothing was registered.
    fn unregister(&self, id: &ReplicaId) -> bool;

    fn resolve(&self, id: &ReplicaId) -> Result<Arc<dyn RemoteNode>, RemoteCallError>;
}

/// Discovery backed by a concurrent map of in-process nodes.
pub struct InProcessDiscovery {
    nodes: DashMap<ReplicaId, Arc<StorageNode>>,
}

impl InProcessDiscovery {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn registered_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for InProcessDiscovery {
    fn default() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }
}

impl ServiceDiscovery for InProcessDiscovery {
    fn register(&self, node: Arc<StorageNode>) {
        tracing::debug!("Registered replica {}", node.id());
        self.nodes.insert(node.id().clone(), node);
    }

    fn unregister(&self, id: &ReplicaId) -> bool {
        let removed = self.nodes.remove(id).is_some();
        if removed {
            tracing::debug!("Unregistered replica {}", id);
        }
        removed
    }

    fn resolve(&self, id: &ReplicaId) -> Result<Arc<dyn RemoteNode>, RemoteCallError> {
        match self.nodes.get(id) {
            Some(node) => {
                let node: Arc<dyn RemoteNode> = node.value().clone();
                Ok(node)
            }
            None => Err(RemoteCallError::not_registered(id)),
        }
    }
}
