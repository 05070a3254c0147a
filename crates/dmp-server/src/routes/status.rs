//! Liveness and storage status

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use dmp_store::StorageStatus;
use serde_json::{json, Value};

/// Status route group
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/database-status", get(database_status))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `GET /api/database-status`
///
/// Always 200; an unreachable medium is reported in the body.
pub async fn database_status(State(state): State<AppState>) -> ApiResult<Json<StorageStatus>> {
    let status = state.with_store(|store| Ok(store.status())).await?;
    Ok(Json(status))
}
