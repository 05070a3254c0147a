//! `/api/data-products`

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use dmp_model::{Product, ProductInput};
use serde::Serialize;
use serde_json::Value;

/// Product route group
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/data-products",
        get(list_products).put(replace_products).post(add_product),
    )
}

/// Body returned by a successful replace
#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/data-products`
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let products = state.with_store(|store| store.list_products()).await?;
    tracing::info!(count = products.len(), "products listed");
    Ok(Json(products))
}

/// `PUT /api/data-products`: replace the whole catalog
pub async fn replace_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ReplaceResponse>> {
    let user = state.authorize_write(&headers).await?;
    let inputs = ProductInput::batch_from_json(parse_json(&body)?)?;
    let requested = inputs.len();

    let stored = state.with_store(move |store| store.replace_all(inputs)).await?;
    tracing::info!(username = %user.username, requested, stored = stored.len(), "catalog replaced");

    Ok(Json(ReplaceResponse {
        success: true,
        message: format!("Updated {} products", stored.len()),
    }))
}

/// `POST /api/data-products`: append one product
pub async fn add_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let user = state.authorize_write(&headers).await?;
    let input = ProductInput::from_json(0, parse_json(&body)?)?;

    let product = state.with_store(move |store| store.add_product(input)).await?;
    tracing::info!(username = %user.username, id = %product.id, "product added");
    Ok((StatusCode::CREATED, Json(product)))
}

fn parse_json(body: &[u8]) -> ApiResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

