//! Persistence backends
//!
//! A backend owns one medium and performs replace-all as a single unit of
//! work: scan stored ids, let the caller plan the batch, then delete and
//! insert everything or nothing.

pub mod flat_file;
pub mod memory;
pub mod sqlite;

pub use flat_file::FlatFileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::config::{BackendKind, StoreConfig};
use crate::error::{CatalogError, ReadError};
use dmp_model::{max_sequence, Product};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Debug;

/// Ids visible to the allocator at the start of a replace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSnapshot {
    /// Ids of every stored record
    pub ids: HashSet<String>,
    /// Largest sequence ever persisted, deleted records included
    pub high_water: u64,
}

/// Outcome of scanning stored ids; a failed scan is not fatal
pub type IdScan = Result<IdSnapshot, CatalogError>;

/// Turns the id scan into the final batch to write
pub type BatchPlanner<'a> = Box<dyn FnOnce(IdScan) -> Vec<Product> + 'a>;

/// Everything readable from the medium
#[derive(Debug, Clone, Default)]
pub struct Loaded {
    /// Decoded records in store order
    pub products: Vec<Product>,
    /// Records skipped because they could not be decoded
    pub skipped: Vec<ReadError>,
}

/// Reachability report for the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    /// Backend label
    pub backend: &'static str,
    /// File or database location, if any
    pub location: Option<String>,
    /// Whether the medium answered
    pub reachable: bool,
    /// Number of stored products when reachable
    pub product_count: Option<usize>,
    /// Failure description when unreachable
    pub detail: Option<String>,
}

/// Persistence medium seam
pub trait CatalogBackend: Send + Sync + Debug {
    /// Stable backend label
    fn kind(&self) -> &'static str;

    /// Human-readable location of the medium
    fn location(&self) -> Option<String> {
        None
    }

    /// Read every record, skipping malformed ones
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`] when the medium cannot be read
    fn load(&self) -> Result<Loaded, CatalogError>;

    /// Replace the entire record set atomically
    ///
    /// The planner receives the stored-id scan and returns the batch. On
    /// any failure the medium is left exactly as it was.
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`], [`CatalogError::ConstraintViolation`]
    /// or [`CatalogError::Storage`]
    fn replace(&self, plan: BatchPlanner<'_>) -> Result<Vec<Product>, CatalogError>;

    /// Count stored records
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`] when the medium cannot be read
    fn count(&self) -> Result<usize, CatalogError>;
}

/// Open the backend named by `config`
///
/// # Errors
/// Invalid configuration or an unreachable medium
pub fn open_backend(config: &StoreConfig) -> Result<Box<dyn CatalogBackend>, CatalogError> {
    config.validate()?;
    let backend: Box<dyn CatalogBackend> = match &config.backend {
        BackendKind::Relational {
            path,
            busy_timeout_ms,
        } => Box::new(SqliteBackend::open(path, *busy_timeout_ms)?),
        BackendKind::FlatFile { path } => Box::new(FlatFileBackend::open(path)?),
        BackendKind::InMemory => Box::new(MemoryBackend::new()),
    };
    tracing::info!(
        backend = backend.kind(),
        location = ?backend.location(),
        "catalog backend opened"
    );
    Ok(backend)
}

/// Reject a batch whose final ids repeat
///
/// # Errors
/// [`CatalogError::ConstraintViolation`] naming the first repeated id
pub fn ensure_unique_ids(batch: &[Product]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(batch.len());
    for product in batch {
        if !seen.insert(product.id.as_str()) {
            return Err(CatalogError::constraint(format!(
                "duplicate product id {}",
                product.id
            )));
        }
    }
    Ok(())
}

/// High-water mark after committing `batch`
#[must_use]
pub fn next_high_water(previous: u64, batch: &[Product]) -> u64 {
    max_sequence(batch.iter().map(|p| p.id.as_str()))
        .unwrap_or(0)
        .max(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_model::ProductInput;

    fn product(id: &str) -> Product {
        ProductInput::named("A").into_product(id)
    }

    #[test]
    fn unique_ids_pass() {
        assert!(ensure_unique_ids(&[product("DP0001"), product("DP0002")]).is_ok());
        assert!(ensure_unique_ids(&[]).is_ok());
    }

    #[test]
    fn duplicate_ids_are_constraint_violations() {
        let err = ensure_unique_ids(&[product("DP0001"), product("X"), product("DP0001")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation { .. }));
        assert!(err.to_string().contains("DP0001"));
    }

    #[test]
    fn high_water_never_decreases() {
        assert_eq!(next_high_water(0, &[product("DP0003"), product("legacy")]), 3);
        assert_eq!(next_high_water(9, &[product("DP0003")]), 9);
        assert_eq!(next_high_water(4, &[]), 4);
    }

    #[test]
    fn open_in_memory_backend() {
        let backend = open_backend(&StoreConfig::in_memory()).unwrap();
        assert_eq!(backend.kind(), "in_memory");
        assert_eq!(backend.count().unwrap(), 0);
    }

    #[test]
    fn open_rejects_invalid_config() {
        let err = open_backend(&StoreConfig::flat_file("")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidConfig(_)));
    }
}
