//! Catalog store facade
//!
//! [`CatalogStore`] owns one backend for its whole lifetime. Writes are
//! serialized through an in-process lock so `add_product` is a safe
//! read-modify-write within a process. Separate processes sharing one
//! database can still lose an `add_product` racing another writer.

use crate::backend::{open_backend, CatalogBackend, StorageStatus};
use crate::config::StoreConfig;
use crate::error::{CatalogError, ReadError};
use crate::plan::plan_batch;
use dmp_model::{validate_batch, Product, ProductInput};
use parking_lot::Mutex;

/// Products plus the records skipped while reading them
#[derive(Debug, Clone, Default)]
pub struct ListReport {
    pub products: Vec<Product>,
    pub skipped: Vec<ReadError>,
}

/// Transactional catalog of data products
#[derive(Debug)]
pub struct CatalogStore {
    backend: Box<dyn CatalogBackend>,
    write_lock: Mutex<()>,
}

impl CatalogStore {
    /// Open the backend described by `config`
    ///
    /// # Errors
    /// Invalid configuration or an unreachable medium
    pub fn open(config: &StoreConfig) -> Result<Self, CatalogError> {
        Ok(Self::with_backend(open_backend(config)?))
    }

    /// Wrap an already-open backend
    #[must_use]
    pub fn with_backend(backend: Box<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Release the backend
    pub fn close(self) {
        tracing::debug!(backend = self.backend.kind(), "catalog store closed");
    }

    /// Backend label
    #[inline]
    #[must_use]
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Every readable product with its tags
    ///
    /// Malformed records are skipped and logged; see
    /// [`Self::list_products_report`] to inspect them.
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`] if the medium cannot be read
    pub fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.list_products_report()?.products)
    }

    /// Like [`Self::list_products`], also returning skipped records
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`] if the medium cannot be read
    pub fn list_products_report(&self) -> Result<ListReport, CatalogError> {
        let loaded = self.backend.load()?;
        tracing::debug!(
            backend = self.backend.kind(),
            products = loaded.products.len(),
            skipped = loaded.skipped.len(),
            "catalog listed"
        );
        Ok(ListReport {
            products: loaded.products,
            skipped: loaded.skipped,
        })
    }

    /// Replace the entire catalog with `inputs`
    ///
    /// Returns the stored batch with final ids. On any error the catalog is
    /// unchanged.
    ///
    /// # Errors
    /// - [`CatalogError::Validation`] when any input lacks a name; nothing is
    ///   touched
    /// - [`CatalogError::ConstraintViolation`] when final ids repeat
    /// - [`CatalogError::StorageUnavailable`] / [`CatalogError::Storage`]
    pub fn replace_all(&self, inputs: Vec<ProductInput>) -> Result<Vec<Product>, CatalogError> {
        validate_batch(&inputs)?;
        let _guard = self.write_lock.lock();
        self.replace_locked(inputs)
    }

    /// Append one product and return its stored form
    ///
    /// # Errors
    /// Same as [`Self::replace_all`]
    pub fn add_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        input.validate(0)?;
        let _guard = self.write_lock.lock();

        let loaded = self.backend.load()?;
        if !loaded.skipped.is_empty() {
            tracing::warn!(
                skipped = loaded.skipped.len(),
                "unreadable records will be dropped by this add"
            );
        }
        let mut inputs: Vec<ProductInput> =
            loaded.products.into_iter().map(ProductInput::from).collect();
        inputs.push(input);

        let mut stored = self.replace_locked(inputs)?;
        stored
            .pop()
            .ok_or_else(|| CatalogError::storage("replace returned an empty batch"))
    }

    /// Reachability and record count
    #[must_use]
    pub fn status(&self) -> StorageStatus {
        let backend = self.backend.kind();
        let location = self.backend.location();
        match self.backend.count() {
            Ok(count) => StorageStatus {
                backend,
                location,
                reachable: true,
                product_count: Some(count),
                detail: None,
            },
            Err(err) => {
                tracing::warn!(backend, error = %err, "storage status probe failed");
                StorageStatus {
                    backend,
                    location,
                    reachable: false,
                    product_count: None,
                    detail: Some(err.to_string()),
                }
            }
        }
    }

    fn replace_locked(&self, inputs: Vec<ProductInput>) -> Result<Vec<Product>, CatalogError> {
        let requested = inputs.len();
        let result = self
            .backend
            .replace(Box::new(move |scan| plan_batch(inputs, scan)));
        match &result {
            Ok(batch) => tracing::info!(
                backend = self.backend.kind(),
                products = batch.len(),
                "catalog replaced"
            ),
            Err(err) => tracing::error!(
                backend = self.backend.kind(),
                requested,
                error = %err,
                "catalog replace rolled back"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use pretty_assertions::assert_eq;

    fn store() -> (CatalogStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        (CatalogStore::with_backend(Box::new(backend.clone())), backend)
    }

    #[test]
    fn validation_happens_before_mutation() {
        let (store, _) = store();
        store.replace_all(vec![ProductInput::named("Keep")]).unwrap();

        let err = store
            .replace_all(vec![ProductInput::named("A"), ProductInput::named("  ")])
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("index 1"));
        assert_eq!(store.list_products().unwrap()[0].name(), "Keep");
    }

    #[test]
    fn add_product_appends_with_next_id() {
        let (store, _) = store();
        store.replace_all(vec![ProductInput::named("A")]).unwrap();
        let added = store.add_product(ProductInput::named("B")).unwrap();
        assert_eq!(added.id, "DP0002");
        assert_eq!(store.list_products().unwrap().len(), 2);
    }

    #[test]
    fn status_reports_unreachable_backend() {
        let (store, backend) = store();
        assert_eq!(store.status().product_count, Some(0));

        backend.set_available(false);
        let status = store.status();
        assert!(!status.reachable);
        assert_eq!(status.backend, "in_memory");
        assert!(status.detail.unwrap().contains("unavailable"));
    }
}
