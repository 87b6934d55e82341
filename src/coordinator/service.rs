//! Coordinator Service
//!
//! Table registry in front of the replica set managers. It owns one manager
//! per `name-KIND` key, validates every operation against the table it
//! targets and keeps the result cache consistent with writes.

use super::cache::ResultCache;
use crate::config::ReplicationConfig;
use crate::error::{Error, Result};
use crate::node::row::FIELD_SEPARATOR;
use crate::partition::types::PartitionSpec;
use crate::replication::manager::ReplicaSetManager;
use crate::replication::types::{FanOutSummary, ReplicaStatus};
use crate::transport::discovery::ServiceDiscovery;
use crate::types::{Operation, OperationKind, TableDef, TableKind, table_key};

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Coordinator {
    tables: DashMap<String, Arc<ReplicaSetManager>>,
    cache: ResultCache,
    discovery: Arc<dyn ServiceDiscovery>,
    config: ReplicationConfig,
    /// Serializes table creation so a duplicate never touches existing files.
    create_lock: Mutex<()>,
}

impl Coordinator {
    pub fn new(discovery: Arc<dyn ServiceDiscovery>, config: ReplicationConfig) -> Arc<Self> {
        Arc::new(Self {
            tables: DashMap::new(),
            cache: ResultCache::new(),
            discovery,
            config,
            create_lock: Mutex::new(()),
        })
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub async fn create(
        &self,
        table: TableDef,
        replica_count: usize,
        spec: PartitionSpec,
    ) -> Result<()> {
        validate_table(&table)?;

        let _guard = self.create_lock.lock().await;
        let key = table.key();
        if self.tables.contains_key(&key) {
            return Err(Error::AlreadyExists(key));
        }

        let manager = ReplicaSetManager::create(
            table,
            replica_count,
            spec,
            self.discovery.clone(),
            &self.config,
        )
        .await?;

        self.tables.insert(key.clone(), Arc::new(manager));
        self.cache.invalidate(&key);
        Ok(())
    }

    pub async fn insert(&self, kind: TableKind, op: &Operation) -> Result<FanOutSummary> {
        let manager = self.writable(kind, op, OperationKind::Insert)?;
        let summary = manager.insert(op).await?;
        self.after_write(&manager, "insert", &summary);
        Ok(summary)
    }

    pub async fn update(&self, kind: TableKind, op: &Operation) -> Result<FanOutSummary> {
        let manager = self.writable(kind, op, OperationKind::Update)?;
        let summary = manager.update(op).await?;
        self.after_write(&manager, "update", &summary);
        Ok(summary)
    }

    pub async fn delete(&self, kind: TableKind, op: &Operation) -> Result<FanOutSummary> {
        let manager = self.writable(kind, op, OperationKind::Delete)?;
        let summary = manager.delete(op).await?;
        self.after_write(&manager, "delete", &summary);
        Ok(summary)
    }

    /// Serves the cached payload when present, otherwise reads and caches it.
    pub async fn select(&self, kind: TableKind, table: &str) -> Result<String> {
        let manager = self.manager(kind, table)?;
        let key = manager.table().key();

        if let Some(payload) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(payload);
        }

        let payload = manager.select().await?;
        self.cache.put(&key, payload.clone());
        Ok(payload)
    }

    pub fn stop_replica(
        &self,
        kind: TableKind,
        table: &str,
        partition: usize,
        replica: usize,
    ) -> Result<()> {
        self.manager(kind, table)?.stop_replica(partition, replica)
    }

    pub fn start_replica(
        &self,
        kind: TableKind,
        table: &str,
        partition: usize,
        replica: usize,
    ) -> Result<()> {
        self.manager(kind, table)?.start_replica(partition, replica)
    }

    pub fn status(&self, kind: TableKind, table: &str) -> Result<Vec<ReplicaStatus>> {
        Ok(self.manager(kind, table)?.status())
    }

    fn manager(&self, kind: TableKind, table: &str) -> Result<Arc<ReplicaSetManager>> {
        let key = table_key(table, kind);
        self.tables
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(Error::NotFound(key))
    }

    fn writable(
        &self,
        kind: TableKind,
        op: &Operation,
        expected: OperationKind,
    ) -> Result<Arc<ReplicaSetManager>> {
        if op.kind != expected {
            return Err(Error::InvalidOperation(format!(
                "expected {:?}, got {:?}",
                expected, op.kind
            )));
        }
        let manager = self.manager(kind, &op.table)?;
        validate_operation(manager.table(), op)?;
        Ok(manager)
    }

    fn after_write(&self, manager: &ReplicaSetManager, op: &str, summary: &FanOutSummary) {
        let key = manager.table().key();
        self.cache.invalidate(&key);

        if summary.is_complete() {
            tracing::debug!("{} on {} reached {}", op, key, summary);
        } else {
            tracing::warn!("{} on {} only reached {}", op, key, summary);
        }
    }
}

fn validate_table(table: &TableDef) -> Result<()> {
    if !table.has_valid_name() {
        return Err(Error::Config(format!(
            "table name '{}' must be non-empty and use only letters, digits or '_'",
            table.name.escape_debug()
        )));
    }

    match (table.kind, &table.columns) {
        (TableKind::Sql, Some(columns)) => {
            if columns.is_empty() {
                return Err(Error::Config("SQL table needs at least one column".to_string()));
            }
            let mut seen = HashSet::new();
            for column in columns {
                check_field("column", column)?;
                if column.is_empty() {
                    return Err(Error::Config("column names cannot be empty".to_string()));
                }
                if !seen.insert(column) {
                    return Err(Error::Config(format!("duplicate column '{}'", column)));
                }
            }
            Ok(())
        }
        (TableKind::Sql, None) => Err(Error::Config("SQL table needs columns".to_string())),
        (TableKind::NoSql, Some(_)) => Err(Error::Config(
            "NoSQL tables are schemaless and take no columns".to_string(),
        )),
        (TableKind::NoSql, None) => Ok(()),
    }
}

/// Checks an operation against the table it targets before any replica is
/// contacted.
fn validate_operation(table: &TableDef, op: &Operation) -> Result<()> {
    if matches!(op.kind, OperationKind::Insert | OperationKind::Update) {
        if op.columns.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "{:?} needs at least one column",
                op.kind
            )));
        }
        if op.columns.len() != op.values.len() {
            return Err(Error::InvalidOperation(format!(
                "{} columns but {} values",
                op.columns.len(),
                op.values.len()
            )));
        }
    }

    if matches!(op.kind, OperationKind::Update | OperationKind::Delete) && op.predicate.is_none()
    {
        return Err(Error::InvalidOperation(format!(
            "{:?} needs a where clause",
            op.kind
        )));
    }

    for field in op.columns.iter().chain(&op.values) {
        check_value(field)?;
    }
    if let Some(predicate) = &op.predicate {
        check_value(&predicate.column)?;
        check_value(&predicate.value)?;
    }

    if let Some(columns) = &table.columns {
        if let Some(unknown) = op.columns.iter().find(|c| !columns.contains(c)) {
            return Err(Error::InvalidOperation(format!(
                "unknown column '{}' for table {}",
                unknown, table.name
            )));
        }
        if let Some(predicate) = &op.predicate
            && !columns.contains(&predicate.column)
        {
            return Err(Error::InvalidOperation(format!(
                "unknown where column '{}' for table {}",
                predicate.column, table.name
            )));
        }
    }

    Ok(())
}

fn check_value(field: &str) -> Result<()> {
    check_field("value", field).map_err(|e| match e {
        Error::Config(message) => Error::InvalidOperation(message),
        other => other,
    })
}

/// Row delimiters cannot appear inside a stored field.
fn check_field(what: &str, field: &str) -> Result<()> {
    if field.contains(FIELD_SEPARATOR) || field.contains('\n') || field.contains('\r') {
        return Err(Error::Config(format!(
            "{} '{}' contains a field or row delimiter",
            what,
            field.escape_debug()
        )));
    }
    Ok(())
}
