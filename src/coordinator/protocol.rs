//! Coordinator HTTP Protocol
//!
//! Client-facing endpoints. Requests carry already-structured operations;
//! every response is `{"message": ...}` except select and status.

use crate::partition::types::PartitionSpec;
use crate::replication::types::ReplicaStatus;
use crate::types::{Operation, TableKind};
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_CREATE: &str = "/create";
pub const ENDPOINT_INSERT: &str = "/insert";
pub const ENDPOINT_UPDATE: &str = "/update";
pub const ENDPOINT_DELETE: &str = "/delete";
pub const ENDPOINT_SELECT: &str = "/select";
pub const ENDPOINT_REPLICA_STOP: &str = "/replica/stop";
pub const ENDPOINT_REPLICA_START: &str = "/replica/start";
pub const ENDPOINT_STATUS: &str = "/status/:kind/:table";

/// Returned for every write that hits a partition with a down replica.
pub const READ_ONLY_MESSAGE: &str = "database in read-only mode due to failure";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRequest {
    pub table: String,
    pub table_kind: TableKind,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default = "default_replica_count")]
    pub replica_count: usize,
    #[serde(default)]
    pub partition: PartitionSpec,
}

fn default_replica_count() -> usize {
    1
}

/// Insert, update and delete all share this envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationRequest {
    pub table_kind: TableKind,
    pub operation: Operation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectRequest {
    pub table_kind: TableKind,
    pub table: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicaRequest {
    pub table_kind: TableKind,
    pub table: String,
    pub partition: usize,
    pub replica: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Newline-terminated rows, partitions already merged.
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectResponse {
    pub rows: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub table: String,
    pub replicas: Vec<ReplicaStatus>,
}
