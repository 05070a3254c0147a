//! Flat JSON document backend
//!
//! Layout: `{"id_high_water": n, "products": [...]}`. A bare array, the
//! legacy `dataProducts.json` shape, is accepted on read and upgraded on the
//! next write. Writes go to a temp file in the same directory and are
//! renamed over the document, so readers see the old or the new catalog,
//! never a torn one.

use super::{ensure_unique_ids, next_high_water, BatchPlanner, CatalogBackend, IdSnapshot, Loaded};
use crate::error::{CatalogError, ReadError};
use dmp_model::Product;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const KIND: &str = "flat_file";

#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    id_high_water: u64,
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct DocumentRef<'a> {
    id_high_water: u64,
    products: &'a [Product],
}

/// Decoded document contents
#[derive(Debug, Default)]
struct Document {
    high_water: u64,
    loaded: Loaded,
}

/// Catalog stored as one JSON file
#[derive(Debug)]
pub struct FlatFileBackend {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    write_guard: Mutex<()>,
}

impl FlatFileBackend {
    /// Open the document at `path`; a missing file is an empty catalog
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`] if `path` exists but is not a
    /// readable file, or its directory does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        match std::fs::metadata(&path) {
            Ok(meta) if !meta.is_file() => {
                return Err(CatalogError::unavailable(
                    KIND,
                    format!("{} is not a regular file", path.display()),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !parent_dir(&path).is_dir() {
                    return Err(CatalogError::unavailable(
                        KIND,
                        format!("directory for {} does not exist", path.display()),
                    ));
                }
            }
            Err(e) => {
                return Err(CatalogError::unavailable(
                    KIND,
                    format!("{}: {e}", path.display()),
                ))
            }
        }
        Ok(Self {
            path,
            write_guard: Mutex::new(()),
        })
    }

    /// Document path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, CatalogError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::default()),
            Err(e) => {
                return Err(CatalogError::unavailable(
                    KIND,
                    format!("{}: {e}", self.path.display()),
                ))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::default());
        }
        let raw: Value = serde_json::from_slice(&bytes).map_err(|e| {
            CatalogError::storage(format!("corrupt catalog document {}: {e}", self.path.display()))
        })?;
        let stored = match raw {
            Value::Array(products) => StoredDocument {
                id_high_water: 0,
                products,
            },
            Value::Object(_) => serde_json::from_value(raw).map_err(|e| {
                CatalogError::storage(format!(
                    "corrupt catalog document {}: {e}",
                    self.path.display()
                ))
            })?,
            _ => {
                return Err(CatalogError::storage(format!(
                    "corrupt catalog document {}: expected object or array",
                    self.path.display()
                )))
            }
        };
        Ok(Document {
            high_water: stored.id_high_water,
            loaded: decode_records(stored.products),
        })
    }

    fn write_document(&self, high_water: u64, products: &[Product]) -> Result<(), CatalogError> {
        let body = serde_json::to_vec_pretty(&DocumentRef {
            id_high_water: high_water,
            products,
        })
        .map_err(|e| CatalogError::storage(format!("encode catalog document: {e}")))?;

        let dir = parent_dir(&self.path);
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
            CatalogError::unavailable(KIND, format!("temp file in {}: {e}", dir.display()))
        })?;
        tmp.write_all(&body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CatalogError::storage(format!("write catalog document: {e}")))?;
        // Dropping an unpersisted temp file removes it, so a failure here
        // leaves the previous document untouched.
        tmp.persist(&self.path)
            .map_err(|e| CatalogError::storage(format!("replace catalog document: {}", e.error)))?;
        Ok(())
    }
}

impl CatalogBackend for FlatFileBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn location(&self) -> Option<String> {
        Some(self.path.display().to_string())
    }

    fn load(&self) -> Result<Loaded, CatalogError> {
        Ok(self.read_document()?.loaded)
    }

    fn replace(&self, plan: BatchPlanner<'_>) -> Result<Vec<Product>, CatalogError> {
        let _guard = self.write_guard.lock();
        let current = self.read_document();
        let previous_high_water = current.as_ref().map_or(0, |doc| doc.high_water);

        let scan = current.map(|doc| IdSnapshot {
            ids: doc
                .loaded
                .products
                .iter()
                .map(|p| p.id.clone())
                .chain(doc.loaded.skipped.iter().map(|s| s.record.clone()))
                .collect(),
            high_water: doc.high_water,
        });
        let batch = plan(scan);
        ensure_unique_ids(&batch)?;

        self.write_document(next_high_water(previous_high_water, &batch), &batch)?;
        Ok(batch)
    }

    fn count(&self) -> Result<usize, CatalogError> {
        Ok(self.read_document()?.loaded.products.len())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn decode_records(records: Vec<Value>) -> Loaded {
    let mut loaded = Loaded::default();
    for (position, record) in records.into_iter().enumerate() {
        let label = record
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .map_or_else(|| format!("#{position}"), str::to_string);

        let decoded = serde_json::from_value::<Product>(record)
            .map_err(|e| e.to_string())
            .and_then(|product| product.check_invariants().map(|()| product));
        match decoded {
            Ok(product) => loaded.products.push(product),
            Err(reason) => {
                let err = ReadError::new(label, reason);
                tracing::warn!(backend = KIND, "{err}");
                loaded.skipped.push(err);
            }
        }
    }
    loaded
}
