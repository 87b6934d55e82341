use crate::types::{Predicate, ReplicaId};

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single remote call to a single replica.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteCallError {
    #[error("Replica {0} is not registered")]
    NotRegistered(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Remote returned status {0}")]
    Status(u16),

    #[error("Store failure on replica: {0}")]
    Store(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RemoteCallError {
    pub fn not_registered(id: &ReplicaId) -> Self {
        RemoteCallError::NotRegistered(id.to_string())
    }
}

/// The remote-callable contract of a storage node.
///
/// Implemented by the node itself (in-process calls) and by `HttpNodeClient`.
/// Positions are 0-based data-row indexes, header excluded.
#[async_trait]
pub trait RemoteNode: Send + Sync {
    async fn select(&self) -> Result<Vec<String>, RemoteCallError>;

    async fn insert(&self, columns: &[String], values: &[String]) -> Result<(), RemoteCallError>;

    async fn update(
        &self,
        columns: &[String],
        values: &[String],
        predicate: &Predicate,
    ) -> Result<Vec<usize>, RemoteCallError>;

    async fn update_by_positions(
        &self,
        positions: &[usize],
        columns: &[String],
        values: &[String],
    ) -> Result<usize, RemoteCallError>;

    async fn delete(&self, predicate: &Predicate) -> Result<Vec<usize>, RemoteCallError>;

    async fn delete_by_positions(&self, positions: &[usize]) -> Result<usize, RemoteCallError>;

    /// Liveness probe. Never touches the record store.
    async fn heartbeat(&self) -> Result<(), RemoteCallError>;
}
