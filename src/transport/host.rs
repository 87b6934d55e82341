//! Storage Node Host
//!
//! An axum service that exposes any number of in-process `StorageNode`s over
//! HTTP. Nodes are bound and unbound at runtime; an unbound replica answers
//! `404`, which callers treat the same as an unreachable node.

use super::protocol::*;
use super::remote::{RemoteCallError, RemoteNode};
use crate::node::service::StorageNode;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};
use dashmap::DashMap;
use std::sync::Arc;

type HandlerError = (StatusCode, Json<AckResponse>);
type HandlerResult<T> = Result<Json<T>, HandlerError>;

pub struct NodeHost {
    /// Replica id (display form) -> node.
    nodes: DashMap<String, Arc<StorageNode>>,
}

impl NodeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: DashMap::new(),
        })
    }

    pub fn bind(&self, node: Arc<StorageNode>) {
        let key = node.id().to_string();
        tracing::debug!("Node host bound replica {}", key);
        self.nodes.insert(key, node);
    }

    pub fn unbind(&self, replica_id: &str) -> bool {
        self.nodes.remove(replica_id).is_some()
    }

    pub fn bound_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/node/:replica_id/select", get(handle_select))
            .route("/node/:replica_id/insert", post(handle_insert))
            .route("/node/:replica_id/update", post(handle_update))
            .route(
                "/node/:replica_id/update_positions",
                post(handle_update_positions),
            )
            .route("/node/:replica_id/delete", post(handle_delete))
            .route(
                "/node/:replica_id/delete_positions",
                post(handle_delete_positions),
            )
            .route("/node/:replica_id/heartbeat", get(handle_heartbeat))
            .layer(Extension(self))
    }

    fn lookup(&self, replica_id: &str) -> Result<Arc<StorageNode>, HandlerError> {
        match self.nodes.get(replica_id) {
            Some(node) => Ok(node.value().clone()),
            None => Err((
                StatusCode::NOT_FOUND,
                Json(AckResponse {
                    success: false,
                    error: Some(format!("replica {} not registered", replica_id)),
                }),
            )),
        }
    }
}

fn failure(e: RemoteCallError) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AckResponse {
            success: false,
            error: Some(e.to_string()),
        }),
    )
}

async fn handle_select(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
) -> HandlerResult<SelectResponse> {
    let node = host.lookup(&replica_id)?;
    let rows = node.select().await.map_err(failure)?;
    Ok(Json(SelectResponse { rows }))
}

async fn handle_insert(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
    Json(req): Json<InsertRequest>,
) -> HandlerResult<AckResponse> {
    let node = host.lookup(&replica_id)?;
    node.insert(&req.columns, &req.values)
        .await
        .map_err(failure)?;
    Ok(Json(AckResponse {
        success: true,
        error: None,
    }))
}

async fn handle_update(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> HandlerResult<PositionsResponse> {
    let node = host.lookup(&replica_id)?;
    let positions = node
        .update(&req.columns, &req.values, &req.predicate)
        .await
        .map_err(failure)?;
    Ok(Json(PositionsResponse { positions }))
}

async fn handle_update_positions(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
    Json(req): Json<UpdatePositionsRequest>,
) -> HandlerResult<CountResponse> {
    let node = host.lookup(&replica_id)?;
    let count = node
        .update_by_positions(&req.positions, &req.columns, &req.values)
        .await
        .map_err(failure)?;
    Ok(Json(CountResponse { count }))
}

async fn handle_delete(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
    Json(req): Json<DeleteRequest>,
) -> HandlerResult<PositionsResponse> {
    let node = host.lookup(&replica_id)?;
    let positions = node.delete(&req.predicate).await.map_err(failure)?;
    Ok(Json(PositionsResponse { positions }))
}

async fn handle_delete_positions(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
    Json(req): Json<DeletePositionsRequest>,
) -> HandlerResult<CountResponse> {
    let node = host.lookup(&replica_id)?;
    let count = node
        .delete_by_positions(&req.positions)
        .await
        .map_err(failure)?;
    Ok(Json(CountResponse { count }))
}

async fn handle_heartbeat(
    Extension(host): Extension<Arc<NodeHost>>,
    Path(replica_id): Path<String>,
) -> HandlerResult<AckResponse> {
    let node = host.lookup(&replica_id)?;
    node.heartbeat().await.map_err(failure)?;
    Ok(Json(AckResponse {
        success: true,
        error: None,
    }))
}
