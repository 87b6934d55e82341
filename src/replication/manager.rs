//! Replica Set Manager
//!
//! Owns every replica of one table and drives all reads and writes to them.
//!
//! ## Write Path
//! 1. The router resolves the target partitions.
//! 2. `check_alive` runs for **every** target partition before any replica is
//!    written, so a down replica turns the whole write into `CannotWrite`.
//! 3. The call is fanned out concurrently to every replica of each target.
//!    A failing replica is logged and counted in the `FanOutSummary`; it never
//!    aborts its siblings.
//!
//! ## Read Path
//! One alive replica per partition is asked for its rows; on failure the next
//! alive replica is tried. Horizontal results are concatenated in partition
//! order, vertical results are zipped row by row across column groups.
//!
//! ## Vertical Alignment
//! Row *i* means the same logical row in every column group. Deletes (and
//! updates of columns outside the driver group) are therefore propagated to the
//! other groups by row position, as reported by the driver partition.

use super::heartbeat;
use super::types::{FanOutSummary, Replica, ReplicaStatus};
use crate::config::ReplicationConfig;
use crate::error::{Error, Result};
use crate::node::service::StorageNode;
use crate::partition::router::PartitionRouter;
use crate::partition::types::{PartitionSpec, PartitionType};
use crate::transport::discovery::ServiceDiscovery;
use crate::transport::remote::{RemoteCallError, RemoteNode};
use crate::types::{Operation, Predicate, ReplicaId, TableDef};

use futures::future::join_all;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct ReplicaSetManager {
    table: TableDef,
    router: PartitionRouter,
    /// partition id -> replicas, replica index order.
    partitions: Vec<Vec<Arc<Replica>>>,
    discovery: Arc<dyn ServiceDiscovery>,
    heartbeat: JoinHandle<()>,
}

impl ReplicaSetManager {
    /// Creates `replica_count` storage nodes per partition, registers them with
    /// `discovery` and starts the table's heartbeat loop.
    pub async fn create(
        table: TableDef,
        replica_count: usize,
        spec: PartitionSpec,
        discovery: Arc<dyn ServiceDiscovery>,
        config: &ReplicationConfig,
    ) -> Result<Self> {
        if replica_count == 0 {
            return Err(Error::Config(
                "replica count must be at least 1".to_string(),
            ));
        }
        if !table.has_valid_name() {
            return Err(Error::Config(format!(
                "invalid table name '{}'",
                table.name.escape_debug()
            )));
        }
        if config.heartbeat_interval.is_zero() {
            return Err(Error::Config(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }

        let router = PartitionRouter::new(spec, &table)?;
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let partitions =
            match create_nodes(&table, &router, replica_count, discovery.as_ref(), config).await {
                Ok(partitions) => partitions,
                Err((e, registered)) => {
                    for id in &registered {
                        discovery.unregister(id);
                    }
                    tracing::error!(
                        "Failed to create table {}, released {} replica(s): {}",
                        table.key(),
                        registered.len(),
                        e
                    );
                    return Err(e);
                }
            };

        let heartbeat = heartbeat::spawn(
            table.key(),
            partitions.iter().flatten().cloned().collect(),
            discovery.clone(),
            config.heartbeat_interval,
        );

        tracing::info!(
            "Created table {} with {} partition(s) ({}) x {} replica(s)",
            table.key(),
            router.partition_count(),
            router.partition_type(),
            replica_count
        );

        Ok(Self {
            table,
            router,
            partitions,
            discovery,
            heartbeat,
        })
    }

    pub fn table(&self) -> &TableDef {
        &self.table
    }

    pub fn router(&self) -> &PartitionRouter {
        &self.router
    }

    pub fn replica(&self, partition: usize, replica: usize) -> Option<&Arc<Replica>> {
        self.partitions.get(partition)?.get(replica)
    }

    pub fn replicas(&self, partition: usize) -> &[Arc<Replica>] {
        self.partitions
            .get(partition)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Liveness of every replica, partition-major.
    pub fn status(&self) -> Vec<ReplicaStatus> {
        self.partitions
            .iter()
            .flatten()
            .map(|replica| ReplicaStatus {
                id: replica.id().to_string(),
                partition: replica.id().partition,
                replica: replica.id().replica,
                state: replica.state(),
            })
            .collect()
    }

    /// Fails with `CannotWrite` unless every replica of `partition` is alive.
    pub fn check_alive(&self, partition: usize) -> Result<()> {
        if let Some(down) = self.replicas(partition).iter().find(|r| !r.is_alive()) {
            tracing::warn!(
                "Rejecting write to {} partition {}: replica {} is down",
                self.table.key(),
                partition,
                down.id()
            );
            return Err(Error::CannotWrite {
                partition,
                replica: down.id().to_string(),
            });
        }
        Ok(())
    }

    pub async fn insert(&self, op: &Operation) -> Result<FanOutSummary> {
        let slices = self.router.route_insert(&op.columns, &op.values)?;
        for slice in &slices {
            self.check_alive(slice.partition)?;
        }

        let mut summary = FanOutSummary::default();
        for slice in &slices {
            let (columns, values) = (slice.columns.as_slice(), slice.values.as_slice());
            let (part, _) = self
                .fan_out(slice.partition, "insert", move |node| async move {
                    node.insert(columns, values).await
                })
                .await;
            summary.merge(part);
        }

        tracing::debug!("Insert into {} reached {}", self.table.key(), summary);
        Ok(summary)
    }

    pub async fn update(&self, op: &Operation) -> Result<FanOutSummary> {
        let predicate = required_predicate(op)?;
        let driver = self.router.route_predicate(predicate)?;

        if self.router.partition_type() != PartitionType::Vertical {
            self.check_alive(driver)?;
            let (columns, values) = (op.columns.as_slice(), op.values.as_slice());
            let (summary, _) = self
                .fan_out(driver, "update", move |node| async move {
                    node.update(columns, values, predicate).await
                })
                .await;
            tracing::debug!("Update on {} reached {}", self.table.key(), summary);
            return Ok(summary);
        }

        let slices = self.router.split_assignments(&op.columns, &op.values)?;
        let targets: BTreeSet<usize> = slices
            .iter()
            .map(|slice| slice.partition)
            .chain(std::iter::once(driver))
            .collect();
        for partition in &targets {
            self.check_alive(*partition)?;
        }

        // The driver matches rows with its own columns, even if none are assigned.
        let (driver_columns, driver_values) = slices
            .iter()
            .find(|slice| slice.partition == driver)
            .map(|slice| (slice.columns.as_slice(), slice.values.as_slice()))
            .unwrap_or_default();
        let (mut summary, results) = self
            .fan_out(driver, "update", move |node| async move {
                node.update(driver_columns, driver_values, predicate).await
            })
            .await;

        let positions = first_positions(results);
        if !positions.is_empty() {
            for slice in slices.iter().filter(|slice| slice.partition != driver) {
                let (columns, values) = (slice.columns.as_slice(), slice.values.as_slice());
                let positions = positions.as_slice();
                let (part, _) = self
                    .fan_out(slice.partition, "update by positions", move |node| async move {
                        node.update_by_positions(positions, columns, values).await
                    })
                    .await;
                summary.merge(part);
            }
        }

        tracing::debug!(
            "Vertical update on {} matched rows {:?}, reached {}",
            self.table.key(),
            positions,
            summary
        );
        Ok(summary)
    }

    pub async fn delete(&self, op: &Operation) -> Result<FanOutSummary> {
        let predicate = required_predicate(op)?;
        let driver = self.router.route_predicate(predicate)?;

        if self.router.partition_type() != PartitionType::Vertical {
            self.check_alive(driver)?;
            let (summary, _) = self
                .fan_out(driver, "delete", move |node| async move {
                    node.delete(predicate).await
                })
                .await;
            tracing::debug!("Delete on {} reached {}", self.table.key(), summary);
            return Ok(summary);
        }

        for partition in self.router.partitions() {
            self.check_alive(partition)?;
        }

        let (mut summary, results) = self
            .fan_out(driver, "delete", move |node| async move {
                node.delete(predicate).await
            })
            .await;

        let positions = first_positions(results);
        if !positions.is_empty() {
            for partition in self.router.partitions().filter(|p| *p != driver) {
                let positions = positions.as_slice();
                let (part, _) = self
                    .fan_out(partition, "delete by positions", move |node| async move {
                        node.delete_by_positions(positions).await
                    })
                    .await;
                summary.merge(part);
            }
        }

        tracing::debug!(
            "Vertical delete on {} removed rows {:?}, reached {}",
            self.table.key(),
            positions,
            summary
        );
        Ok(summary)
    }

    /// The table's rows, each followed by a newline.
    pub async fn select(&self) -> Result<String> {
        let mut per_partition = Vec::with_capacity(self.router.partition_count());
        for partition in self.router.partitions() {
            per_partition.push(self.read_partition(partition).await?);
        }

        let rows = match self.router.partition_type() {
            PartitionType::Vertical => self.zip_groups(per_partition),
            _ => per_partition.into_iter().flatten().collect(),
        };

        let mut payload = String::new();
        for row in rows {
            payload.push_str(&row);
            payload.push('\n');
        }
        Ok(payload)
    }

    /// Unregisters a replica's endpoint. Its store is kept; the heartbeat
    /// marks it down on its next tick.
    pub fn stop_replica(&self, partition: usize, replica: usize) -> Result<()> {
        let target = self.lookup(partition, replica)?;
        self.discovery.unregister(target.id());
        tracing::info!("Stopped replica {}", target.id());
        Ok(())
    }

    /// Re-registers a stopped replica with its existing store.
    pub fn start_replica(&self, partition: usize, replica: usize) -> Result<()> {
        let target = self.lookup(partition, replica)?;
        self.discovery.register(target.node().clone());
        tracing::info!("Started replica {}", target.id());
        Ok(())
    }

    fn lookup(&self, partition: usize, replica: usize) -> Result<&Arc<Replica>> {
        self.replica(partition, replica).ok_or_else(|| {
            Error::InvalidOperation(format!(
                "table {} has no replica {} in partition {}",
                self.table.key(),
                replica,
                partition
            ))
        })
    }

    /// Rows of `partition` from the first alive replica that answers.
    async fn read_partition(&self, partition: usize) -> Result<Vec<String>> {
        for replica in self.replicas(partition).iter().filter(|r| r.is_alive()) {
            let rows = match self.discovery.resolve(replica.id()) {
                Ok(node) => node.select().await,
                Err(e) => Err(e),
            };
            match rows {
                Ok(rows) => return Ok(rows),
                Err(e) => {
                    tracing::warn!("Select on replica {} failed: {}", replica.id(), e);
                }
            }
        }

        Err(Error::NoLiveReplica(partition))
    }

    /// Joins row `i` of every column group into one logical row.
    fn zip_groups(&self, per_partition: Vec<Vec<String>>) -> Vec<String> {
        let longest = per_partition.iter().map(Vec::len).max().unwrap_or(0);
        let mut rows = Vec::with_capacity(longest);

        for idx in 0..longest {
            let mut row = String::new();
            for (partition, group_rows) in per_partition.iter().enumerate() {
                match group_rows.get(idx) {
                    Some(fields) => row.push_str(fields),
                    None => {
                        tracing::warn!(
                            "Partition {} of {} has no row {}; column groups are misaligned",
                            partition,
                            self.table.key(),
                            idx
                        );
                        row.push_str(&",".repeat(self.group_width(partition)));
                    }
                }
            }
            rows.push(row);
        }

        rows
    }

    fn group_width(&self, partition: usize) -> usize {
        self.router
            .spec()
            .column_groups
            .as_ref()
            .and_then(|groups| groups.get(partition))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Runs `call` against every replica of `partition` concurrently.
    ///
    /// Returns the summary plus the successful results in replica order.
    async fn fan_out<T, F, Fut>(
        &self,
        partition: usize,
        op: &str,
        call: F,
    ) -> (FanOutSummary, Vec<T>)
    where
        F: Fn(Arc<dyn RemoteNode>) -> Fut,
        Fut: Future<Output = std::result::Result<T, RemoteCallError>>,
    {
        let replicas = self.replicas(partition);
        let outcomes = join_all(replicas.iter().map(|replica| {
            let resolved = self.discovery.resolve(replica.id());
            let call = &call;
            async move {
                match resolved {
                    Ok(node) => call(node).await,
                    Err(e) => Err(e),
                }
            }
        }))
        .await;

        let mut summary = FanOutSummary::default();
        let mut results = Vec::new();
        for (replica, outcome) in replicas.iter().zip(outcomes) {
            match outcome {
                Ok(value) => {
                    summary.record_success();
                    results.push(value);
                }
                Err(e) => {
                    tracing::warn!("{} on replica {} failed: {}", op, replica.id(), e);
                    summary.record_failure(replica.id(), e);
                }
            }
        }

        (summary, results)
    }
}

impl Drop for ReplicaSetManager {
    fn drop(&mut self) {
        self.heartbeat.abort();
        for replica in self.partitions.iter().flatten() {
            self.discovery.unregister(replica.id());
        }
        tracing::debug!("Released replicas of table {}", self.table.key());
    }
}

/// Creates and registers every storage node of the table. On failure the ids
/// registered so far are handed back so the caller can release them.
async fn create_nodes(
    table: &TableDef,
    router: &PartitionRouter,
    replica_count: usize,
    discovery: &dyn ServiceDiscovery,
    config: &ReplicationConfig,
) -> std::result::Result<Vec<Vec<Arc<Replica>>>, (Error, Vec<ReplicaId>)> {
    let mut registered = Vec::new();
    let mut partitions = Vec::with_capacity(router.partition_count());

    for partition in router.partitions() {
        let columns = store_columns(table, router, partition);
        let mut replicas = Vec::with_capacity(replica_count);

        for replica in 0..replica_count {
            let id = ReplicaId::new(table, partition, replica);
            let node = match StorageNode::create(id.clone(), &config.data_dir, columns.clone()).await
            {
                Ok(node) => node,
                Err(e) => return Err((e.into(), registered)),
            };
            discovery.register(node.clone());
            registered.push(id);
            replicas.push(Arc::new(Replica::new(node)));
        }

        partitions.push(replicas);
    }

    Ok(partitions)
}

/// Header columns of one partition's stores: the group for vertical tables,
/// the whole table otherwise.
fn store_columns(
    table: &TableDef,
    router: &PartitionRouter,
    partition: usize,
) -> Option<Vec<String>> {
    match router.partition_type() {
        PartitionType::Vertical => router
            .spec()
            .column_groups
            .as_ref()
            .and_then(|groups| groups.get(partition).cloned()),
        _ => table.columns.clone(),
    }
}

fn required_predicate(op: &Operation) -> Result<&Predicate> {
    op.predicate.as_ref().ok_or_else(|| {
        Error::InvalidOperation(format!("{:?} on {} needs a where clause", op.kind, op.table))
    })
}

/// Positions reported by the first replica that answered.
fn first_positions(results: Vec<Vec<usize>>) -> Vec<usize> {
    results.into_iter().next().unwrap_or_default()
}
