//! Storage Node Network Protocol
//!
//! Endpoints and DTOs for calling a storage node over HTTP. Every route lives
//! under `/node/:replica_id`, where `replica_id` is the `ReplicaId` display
//! form (`table-kind-partition-replica`). A replica that is not registered on
//! the host answers `404 Not Found`.

use crate::types::Predicate;
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_NODE_PREFIX: &str = "/node";
pub const ENDPOINT_SELECT: &str = "/select";
pub const ENDPOINT_INSERT: &str = "/insert";
pub const ENDPOINT_UPDATE: &str = "/update";
pub const ENDPOINT_UPDATE_POSITIONS: &str = "/update_positions";
pub const ENDPOINT_DELETE: &str = "/delete";
pub const ENDPOINT_DELETE_POSITIONS: &str = "/delete_positions";
pub const ENDPOINT_HEARTBEAT: &str = "/heartbeat";

/// Builds `<base><prefix>/<replica_id><endpoint>`.
pub fn node_url(base: &str, replica_id: &str, endpoint: &str) -> String {
    format!("{}{}/{}{}", base, ENDPOINT_NODE_PREFIX, replica_id, endpoint)
}

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectResponse {
    pub rows: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsertRequest {
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub columns: Vec<String>,
    pub values: Vec<String>,
    pub predicate: Predicate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePositionsRequest {
    pub positions: Vec<usize>,
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub predicate: Predicate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletePositionsRequest {
    pub positions: Vec<usize>,
}

/// Row positions matched by an update or delete (pre-mutation numbering).
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionsResponse {
    pub positions: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Acknowledgment for inserts and heartbeats, and error body for failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}
