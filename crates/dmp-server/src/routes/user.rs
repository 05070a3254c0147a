//! `/api/user-info`

use crate::identity::UserInfo;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

/// User route group
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/user-info", get(user_info))
}

/// `GET /api/user-info`
pub async fn user_info(State(state): State<AppState>, headers: HeaderMap) -> Json<UserInfo> {
    Json(state.identity.identify(&headers).await)
}
