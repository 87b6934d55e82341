use super::protocol::*;
use super::service::Coordinator;
use crate::error::Error;
use crate::types::{TableDef, TableKind, table_key};

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(ENDPOINT_CREATE, post(handle_create))
        .route(ENDPOINT_INSERT, post(handle_insert))
        .route(ENDPOINT_UPDATE, post(handle_update))
        .route(ENDPOINT_DELETE, post(handle_delete))
        .route(ENDPOINT_SELECT, post(handle_select))
        .route(ENDPOINT_REPLICA_STOP, post(handle_stop_replica))
        .route(ENDPOINT_REPLICA_START, post(handle_start_replica))
        .route(ENDPOINT_STATUS, get(handle_status))
        .layer(Extension(coordinator))
}

fn message(status: StatusCode, text: impl Into<String>) -> (StatusCode, Json<MessageResponse>) {
    (
        status,
        Json(MessageResponse {
            message: text.into(),
        }),
    )
}

/// Typed failures are the caller's problem (400); storage failures are ours (500).
fn failure(e: Error) -> (StatusCode, Json<MessageResponse>) {
    match e {
        Error::CannotWrite { .. } => message(StatusCode::BAD_REQUEST, READ_ONLY_MESSAGE),
        Error::Io(e) => {
            tracing::error!("Request failed with I/O error: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        other => message(StatusCode::BAD_REQUEST, other.to_string()),
    }
}

pub async fn handle_create(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<CreateRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let table = TableDef {
        name: req.table,
        kind: req.table_kind,
        columns: req.columns,
    };
    let key = table.key();

    match coordinator
        .create(table, req.replica_count, req.partition)
        .await
    {
        Ok(()) => message(StatusCode::OK, format!("table {} created", key)),
        Err(e) => {
            tracing::warn!("Failed to create table {}: {}", key, e);
            failure(e)
        }
    }
}

pub async fn handle_insert(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<OperationRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    match coordinator.insert(req.table_kind, &req.operation).await {
        Ok(_) => message(StatusCode::OK, "insert successful"),
        Err(e) => failure(e),
    }
}

pub async fn handle_update(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<OperationRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    match coordinator.update(req.table_kind, &req.operation).await {
        Ok(_) => message(StatusCode::OK, "update successful"),
        Err(e) => failure(e),
    }
}

pub async fn handle_delete(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<OperationRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    match coordinator.delete(req.table_kind, &req.operation).await {
        Ok(_) => message(StatusCode::OK, "delete successful"),
        Err(e) => failure(e),
    }
}

pub async fn handle_select(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<SelectRequest>,
) -> Response {
    match coordinator.select(req.table_kind, &req.table).await {
        Ok(rows) => (StatusCode::OK, Json(SelectResponse { rows })).into_response(),
        Err(e) => failure(e).into_response(),
    }
}

pub async fn handle_stop_replica(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<ReplicaRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    match coordinator.stop_replica(req.table_kind, &req.table, req.partition, req.replica) {
        Ok(()) => message(
            StatusCode::OK,
            format!("replica {}/{} stopped", req.partition, req.replica),
        ),
        Err(e) => failure(e),
    }
}

pub async fn handle_start_replica(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<ReplicaRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    match coordinator.start_replica(req.table_kind, &req.table, req.partition, req.replica) {
        Ok(()) => message(
            StatusCode::OK,
            format!("replica {}/{} started", req.partition, req.replica),
        ),
        Err(e) => failure(e),
    }
}

pub async fn handle_status(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path((kind, table)): Path<(String, String)>,
) -> Response {
    let kind: TableKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return message(StatusCode::BAD_REQUEST, e).into_response(),
    };

    match coordinator.status(kind, &table) {
        Ok(replicas) => (
            StatusCode::OK,
            Json(StatusResponse {
                table: table_key(&table, kind),
                replicas,
            }),
        )
            .into_response(),
        Err(e) => failure(e).into_response(),
    }
}
