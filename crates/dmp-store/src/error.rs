//! Error types for the catalog store
//!
//! Read and write paths fail differently:
//! - reads skip a malformed record and report it as a [`ReadError`]
//! - writes roll back and surface a [`CatalogError`]
//!
//! An empty catalog is `Ok(vec![])`, never an error; an unreachable medium
//! is always [`CatalogError::StorageUnavailable`].

use dmp_model::ValidationError;

/// Main catalog error type
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Inbound batch rejected before any mutation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Backing medium could not be opened or a transaction could not start
    #[error("{backend} storage unavailable: {message}")]
    StorageUnavailable {
        backend: &'static str,
        message: String,
    },

    /// Uniqueness or foreign-key violation surfaced during commit
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Any other engine or I/O failure inside an operation
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Store configuration cannot be used
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl CatalogError {
    /// Create storage-unavailable error
    #[inline]
    pub fn unavailable(backend: &'static str, message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            backend,
            message: message.into(),
        }
    }

    /// Create constraint violation
    #[inline]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Create generic storage error
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Caller sent something the store refuses
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// A later attempt may succeed; the store itself never retries
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

/// A stored record that could not be decoded and was skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("skipped record {record}: {reason}")]
pub struct ReadError {
    /// Record id, or its position when the id itself is unreadable
    pub record: String,
    /// Why the record was rejected
    pub reason: String,
}

impl ReadError {
    /// Create read error
    #[inline]
    pub fn new(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_client_error() {
        let err = CatalogError::from(ValidationError::MissingName { index: 0 });
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("missing required field: name"));
    }

    #[test]
    fn unavailable_is_retryable() {
        let err = CatalogError::unavailable("relational", "unable to open database file");
        assert!(err.is_retryable());
        assert!(!err.is_client_error());
        assert_eq!(
            err.to_string(),
            "relational storage unavailable: unable to open database file"
        );
    }

    #[test]
    fn constraint_is_neither() {
        let err = CatalogError::constraint("duplicate id DP0001");
        assert!(!err.is_retryable());
        assert!(!err.is_client_error());
    }

    #[test]
    fn read_error_display() {
        let err = ReadError::new("DP0003", "empty name");
        assert_eq!(err.to_string(), "skipped record DP0003: empty name");
    }
}
