//! HTTP error type and JSON error payloads

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dmp_model::ValidationError;
use dmp_store::CatalogError;
use serde::Serialize;

/// Error body detail
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Stable machine-readable code
    pub code: &'static str,
    pub message: String,
}

/// `{"error": {...}}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Handler error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    /// Write conflicted with stored state (duplicate id)
    #[error("{message}")]
    Conflict { message: String },

    /// Storage unreachable or request timed out; retryable
    #[error("{message}")]
    ServiceUnavailable { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    #[inline]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    #[inline]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    fn to_status_and_payload(&self) -> (StatusCode, ApiErrorResponse) {
        let (status, code) = match self {
            Self::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };
        (
            status,
            ApiErrorResponse {
                error: ApiErrorDetail {
                    code,
                    message: self.to_string(),
                },
            },
        )
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(inner) => inner.into(),
            CatalogError::StorageUnavailable { .. } => Self::ServiceUnavailable {
                message: err.to_string(),
            },
            CatalogError::ConstraintViolation { .. } => Self::Conflict {
                message: err.to_string(),
            },
            CatalogError::Storage { .. } | CatalogError::InvalidConfig(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = self.to_status_and_payload();
        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error = %payload.error.message,
                "request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error = %payload.error.message,
                "request rejected"
            );
        }
        (status, axum::Json(payload)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;
