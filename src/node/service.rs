use super::store::{RecordStore, StoreError};
use crate::transport::remote::{RemoteCallError, RemoteNode};
use crate::types::{Predicate, ReplicaId};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Storage Node Service: one replica's record store behind the
/// `RemoteNode` contract.
pub struct StorageNode {
    id: ReplicaId,
    store: RecordStore,
}

impl StorageNode {
    /// Creates the node and its backing file `<data_dir>/<replica id>.csv`.
    pub async fn create(
        id: ReplicaId,
        data_dir: &Path,
        columns: Option<Vec<String>>,
    ) -> Result<Arc<Self>, StoreError> {
        let path = data_dir.join(format!("{}.csv", id));
        let store = RecordStore::create(path, columns).await?;

        Ok(Arc::new(Self { id, store }))
    }

    pub fn id(&self) -> &ReplicaId {
        &self.id
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn store_failure(&self, op: &str, e: StoreError) -> RemoteCallError {
        tracing::error!("Replica {} failed to {}: {}", self.id, op, e);
        RemoteCallError::Store(e.to_string())
    }
}

#[async_trait]
impl RemoteNode for StorageNode {
    async fn select(&self) -> Result<Vec<String>, RemoteCallError> {
        self.store
            .select()
            .await
            .map_err(|e| self.store_failure("select", e))
    }

    async fn insert(&self, columns: &[String], values: &[String]) -> Result<(), RemoteCallError> {
        self.store
            .insert(columns, values)
            .await
            .map_err(|e| self.store_failure("insert", e))
    }

    async fn update(
        &self,
        columns: &[String],
        values: &[String],
        predicate: &Predicate,
    ) -> Result<Vec<usize>, RemoteCallError> {
        let positions = self
            .store
            .update(columns, values, predicate)
            .await
            .map_err(|e| self.store_failure("update", e))?;
        tracing::debug!("Replica {} updated rows {:?}", self.id, positions);
        Ok(positions)
    }

    async fn update_by_positions(
        &self,
        positions: &[usize],
        columns: &[String],
        values: &[String],
    ) -> Result<usize, RemoteCallError> {
        self.store
            .update_by_positions(positions, columns, values)
            .await
            .map_err(|e| self.store_failure("update by positions", e))
    }

    async fn delete(&self, predicate: &Predicate) -> Result<Vec<usize>, RemoteCallError> {
        let positions = self
            .store
            .delete(predicate)
            .await
            .map_err(|e| self.store_failure("delete", e))?;
        tracing::debug!("Replica {} deleted rows {:?}", self.id, positions);
        Ok(positions)
    }

    async fn delete_by_positions(&self, positions: &[usize]) -> Result<usize, RemoteCallError> {
        self.store
            .delete_by_positions(positions)
            .await
            .map_err(|e| self.store_failure("delete by positions", e))
    }

    async fn heartbeat(&self) -> Result<(), RemoteCallError> {
        Ok(())
    }
}
