//! Axum server and routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use conn_service::{Connection, ConnectionError, ConnectionService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub service: Arc<ConnectionService>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/connections",
            post(handle_create).get(handle_search).delete(handle_delete),
        )
        .route("/connections/exists", get(handle_exists))
        .route("/connections/repair", post(handle_repair))
        .route("/peers", get(handle_search_peers))
        .route("/peers/repair", post(handle_repair_peers))
        .route("/weight", get(handle_weight))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Identifies one directed edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRequest {
    pub namespace_a: String,
    pub namespace_b: String,
    pub peer_a_id: String,
    pub peer_b_id: String,
}

/// Identifies one adjacency set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRequest {
    pub namespace_a: String,
    pub namespace_b: String,
    pub peer_a_id: String,
}

/// Response envelope shared by every JSON route.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct ExistsData {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct RepairData {
    pub outcome: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PruneData {
    pub pruned: usize,
}

#[derive(Debug, Serialize)]
pub struct WeightData {
    pub weight: f64,
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn success<T>(data: Option<T>) -> ApiResult<T> {
    (
        StatusCode::OK,
        Json(ApiResponse {
            code: StatusCode::OK.as_u16(),
            message: "Success".to_string(),
            data,
        }),
    )
}

fn failure<T>(err: ConnectionError) -> ApiResult<T> {
    let status = match &err {
        ConnectionError::NotFound(_) => StatusCode::NOT_FOUND,
        ConnectionError::InvalidKey(_) | ConnectionError::InvalidConfig(_) => {
            StatusCode::BAD_REQUEST
        }
        ConnectionError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "connection request failed");
    }
    (
        status,
        Json(ApiResponse {
            code: status.as_u16(),
            message: err.to_string(),
            data: None,
        }),
    )
}

async fn handle_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EdgeRequest>,
) -> ApiResult<Connection> {
    match state
        .service
        .create(&req.namespace_a, &req.namespace_b, &req.peer_a_id, &req.peer_b_id)
        .await
    {
        Ok(conn) => success(Some(conn)),
        Err(e) => failure(e),
    }
}

async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EdgeRequest>,
) -> ApiResult<()> {
    match state
        .service
        .delete(&req.namespace_a, &req.namespace_b, &req.peer_a_id, &req.peer_b_id)
        .await
    {
        Ok(()) => success(None),
        Err(e) => failure(e),
    }
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    Query(req): Query<EdgeRequest>,
) -> ApiResult<Connection> {
    match state
        .service
        .search(&req.namespace_a, &req.namespace_b, &req.peer_a_id, &req.peer_b_id)
        .await
    {
        Ok(conn) => success(Some(conn)),
        Err(e) => failure(e),
    }
}

async fn handle_exists(
    State(state): State<Arc<AppState>>,
    Query(req): Query<EdgeRequest>,
) -> ApiResult<ExistsData> {
    match state
        .service
        .exists(&req.namespace_a, &req.namespace_b, &req.peer_a_id, &req.peer_b_id)
        .await
    {
        Ok(exists) => success(Some(ExistsData { exists })),
        Err(e) => failure(e),
    }
}

async fn handle_repair(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EdgeRequest>,
) -> ApiResult<RepairData> {
    match state
        .service
        .repair(&req.namespace_a, &req.namespace_b, &req.peer_a_id, &req.peer_b_id)
        .await
    {
        Ok(outcome) => success(Some(RepairData {
            outcome: outcome.as_str(),
        })),
        Err(e) => failure(e),
    }
}

async fn handle_search_peers(
    State(state): State<Arc<AppState>>,
    Query(req): Query<PeerRequest>,
) -> ApiResult<Vec<String>> {
    match state
        .service
        .search_peers(&req.namespace_a, &req.namespace_b, &req.peer_a_id)
        .await
    {
        Ok(peers) => success(Some(peers)),
        Err(e) => failure(e),
    }
}

async fn handle_repair_peers(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PeerRequest>,
) -> ApiResult<PruneData> {
    match state
        .service
        .repair_peers(&req.namespace_a, &req.namespace_b, &req.peer_a_id)
        .await
    {
        Ok(pruned) => success(Some(PruneData { pruned })),
        Err(e) => failure(e),
    }
}

async fn handle_weight(State(state): State<Arc<AppState>>) -> ApiResult<WeightData> {
    success(Some(WeightData {
        weight: state.service.weight(),
    }))
}

async fn handle_health() -> &'static str {
    "ok"
}
