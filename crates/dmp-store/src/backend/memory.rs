//! In-memory backend
//!
//! Clones share state, so a test can keep a handle and flip availability
//! while a [`crate::CatalogStore`] owns another.

use super::{ensure_unique_ids, next_high_water, BatchPlanner, CatalogBackend, IdSnapshot, Loaded};
use crate::error::CatalogError;
use dmp_model::Product;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const KIND: &str = "in_memory";

#[derive(Debug, Default)]
struct MemoryState {
    products: Vec<Product>,
    high_water: u64,
}

#[derive(Debug)]
struct Inner {
    state: RwLock<MemoryState>,
    available: AtomicBool,
}

/// Process-memory catalog
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    /// Create empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(MemoryState::default()),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Simulate the medium going away or coming back
    #[inline]
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Persisted high-water mark
    #[inline]
    #[must_use]
    pub fn high_water(&self) -> u64 {
        self.inner.state.read().high_water
    }

    fn ensure_available(&self) -> Result<(), CatalogError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CatalogError::unavailable(KIND, "backend marked unavailable"))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn load(&self) -> Result<Loaded, CatalogError> {
        self.ensure_available()?;
        Ok(Loaded {
            products: self.inner.state.read().products.clone(),
            skipped: Vec::new(),
        })
    }

    fn replace(&self, plan: BatchPlanner<'_>) -> Result<Vec<Product>, CatalogError> {
        self.ensure_available()?;
        let mut state = self.inner.state.write();
        let snapshot = IdSnapshot {
            ids: state.products.iter().map(|p| p.id.clone()).collect(),
            high_water: state.high_water,
        };
        let batch = plan(Ok(snapshot));
        ensure_unique_ids(&batch)?;

        state.high_water = next_high_water(state.high_water, &batch);
        state.products.clone_from(&batch);
        Ok(batch)
    }

    fn count(&self) -> Result<usize, CatalogError> {
        self.ensure_available()?;
        Ok(self.inner.state.read().products.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_model::ProductInput;

    fn batch(ids: &[&str]) -> Vec<Product> {
        ids.iter()
            .map(|id| ProductInput::named("A").into_product(*id))
            .collect()
    }

    #[test]
    fn replace_then_load() {
        let backend = MemoryBackend::new();
        let written = backend
            .replace(Box::new(|_| batch(&["DP0001", "DP0002"])))
            .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(backend.load().unwrap().products, written);
        assert_eq!(backend.high_water(), 2);
    }

    #[test]
    fn planner_sees_stored_ids() {
        let backend = MemoryBackend::new();
        backend.replace(Box::new(|_| batch(&["DP0004"]))).unwrap();
        backend
            .replace(Box::new(|scan| {
                let snapshot = scan.unwrap();
                assert!(snapshot.ids.contains("DP0004"));
                assert_eq!(snapshot.high_water, 4);
                Vec::new()
            }))
            .unwrap();
        assert_eq!(backend.count().unwrap(), 0);
        assert_eq!(backend.high_water(), 4);
    }

    #[test]
    fn duplicate_batch_leaves_state() {
        let backend = MemoryBackend::new();
        backend.replace(Box::new(|_| batch(&["DP0001"]))).unwrap();
        let err = backend
            .replace(Box::new(|_| batch(&["DP0002", "DP0002"])))
            .unwrap_err();
        assert!(matches!(err, CatalogError::ConstraintViolation { .. }));
        assert_eq!(backend.load().unwrap().products, batch(&["DP0001"]));
    }

    #[test]
    fn unavailable_is_distinct_from_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.load().unwrap().products.is_empty());

        backend.set_available(false);
        assert!(matches!(
            backend.load().unwrap_err(),
            CatalogError::StorageUnavailable { .. }
        ));
        assert!(backend.count().is_err());

        backend.set_available(true);
        assert_eq!(backend.count().unwrap(), 0);
    }
}
