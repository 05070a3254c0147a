//! Application router

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::routes;
use crate::state::AppState;
use axum::error_handling::HandleErrorLayer;
use axum::extract::OriginalUri;
use axum::http::{header, HeaderValue, Method};
use axum::routing::any;
use axum::Router;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Build the full application
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .merge(routes::products::routes())
        .merge(routes::status::routes())
        .merge(routes::user::routes())
        .route("/api/*rest", any(api_not_found));

    let router = match &config.static_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "serving front end");
            let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            router.fallback_service(spa)
        }
        None => router.fallback(not_found),
    };

    router
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        )
        .with_state(state)
}

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if !config.is_production() {
        return CorsLayer::permissive();
    }
    let suffixes = config.cors.allowed_origin_suffixes.clone();
    tracing::info!(?suffixes, "production CORS configured");
    CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|o| origin_allowed(o, &suffixes))
        }))
}

/// `https` origin whose host ends with one of `suffixes`
#[must_use]
pub fn origin_allowed(origin: &str, suffixes: &[String]) -> bool {
    let Some(rest) = origin.strip_prefix("https://") else {
        return false;
    };
    let host = rest.split(['/', ':']).next().unwrap_or_default();
    !host.is_empty() && suffixes.iter().any(|suffix| host.ends_with(suffix.as_str()))
}

async fn api_not_found(uri: OriginalUri) -> ApiError {
    ApiError::not_found(format!("API endpoint not found: {}", uri.0.path()))
}

async fn not_found(uri: OriginalUri) -> ApiError {
    ApiError::not_found(format!("not found: {}", uri.0.path()))
}

async fn handle_timeout_error(err: tower::BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::ServiceUnavailable {
            message: "request timed out".to_string(),
        }
    } else {
        ApiError::internal(format!("unhandled middleware error: {err}"))
    }
}
