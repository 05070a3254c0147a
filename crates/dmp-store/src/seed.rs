//! Initial catalog loading from a JSON seed file
//!
//! Seed files come in the shapes older deployments produced:
//! - a bare array of products
//! - the flat-file document `{"products": [...]}`
//! - `tags` as one comma-separated string instead of a list

use crate::catalog::CatalogStore;
use crate::error::CatalogError;
use dmp_model::{ProductInput, ValidationError};
use serde_json::Value;
use std::path::Path;

/// How to treat a catalog that already has records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// Seed only an empty catalog
    #[default]
    IfEmpty,
    /// Replace whatever is stored
    Replace,
}

/// Outcome of a seed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    /// Products written
    pub inserted: usize,
    /// Products already present that prevented seeding
    pub skipped_existing: usize,
}

/// Read seed inputs from `path`
///
/// # Errors
/// I/O failures, invalid JSON, or records that are not product objects
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<ProductInput>, CatalogError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| CatalogError::unavailable("seed_file", format!("{}: {e}", path.display())))?;
    let raw: Value = serde_json::from_slice(&bytes)
        .map_err(|e| CatalogError::storage(format!("invalid seed file {}: {e}", path.display())))?;
    let inputs = parse_seed(raw)?;
    tracing::info!(path = %path.display(), products = inputs.len(), "seed file loaded");
    Ok(inputs)
}

/// Parse an already-decoded seed document
///
/// # Errors
/// [`CatalogError::Validation`] for shapes that are not a product list
pub fn parse_seed(raw: Value) -> Result<Vec<ProductInput>, CatalogError> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut document) => match document.remove("products") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::NotAnArray.into()),
        },
        _ => return Err(ValidationError::NotAnArray.into()),
    };
    let items = items.into_iter().map(split_tag_string).collect();
    Ok(ProductInput::batch_from_json(Value::Array(items))?)
}

/// Write `inputs` into `store` according to `mode`
///
/// # Errors
/// Whatever [`CatalogStore::replace_all`] returns
pub fn seed(
    store: &CatalogStore,
    inputs: Vec<ProductInput>,
    mode: SeedMode,
) -> Result<SeedReport, CatalogError> {
    if mode == SeedMode::IfEmpty {
        let existing = store.list_products_report()?;
        let count = existing.products.len() + existing.skipped.len();
        if count > 0 {
            tracing::info!(existing = count, "catalog not empty; seed skipped");
            return Ok(SeedReport {
                inserted: 0,
                skipped_existing: count,
            });
        }
    }
    let stored = store.replace_all(inputs)?;
    tracing::info!(inserted = stored.len(), ?mode, "catalog seeded");
    Ok(SeedReport {
        inserted: stored.len(),
        skipped_existing: 0,
    })
}

fn split_tag_string(mut item: Value) -> Value {
    if let Some(Value::String(joined)) = item.get("tags") {
        let list = joined
            .split(',')
            .map(|tag| Value::String(tag.trim().to_string()))
            .collect();
        item["tags"] = Value::Array(list);
    }
    item
}
