//! Relational backend on `SQLite`
//!
//! Tables:
//! - `data_products`: one row per record, descriptive columns in
//!   [`ATTRIBUTE_COLUMNS`] order plus `created_at` / `updated_at`
//! - `data_product_tags`: one row per tag, ordered by its rowid
//! - `catalog_sequence`: the id high-water mark
//!
//! A replace runs scan, delete and insert inside one transaction; dropping
//! the transaction on any error rolls everything back.

use super::{BatchPlanner, CatalogBackend, IdSnapshot, IdScan, Loaded};
use crate::config::IN_MEMORY_PATH;
use crate::error::{CatalogError, ReadError};
use dmp_model::{
    max_sequence, normalize_tags, Product, ProductAttributes, ATTRIBUTE_COLUMNS, ATTRIBUTE_COUNT,
};
use parking_lot::Mutex;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension, Row,
    Transaction,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const KIND: &str = "relational";

/// Key of the product id counter in `catalog_sequence`
const SEQUENCE_NAME: &str = "data_products";

/// Catalog stored in relational tables
#[derive(Debug)]
pub struct SqliteBackend {
    path: PathBuf,
    connection: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path`
    ///
    /// `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    /// [`CatalogError::StorageUnavailable`] if the database cannot be opened
    /// or its schema cannot be created
    pub fn open(path: impl AsRef<Path>, busy_timeout_ms: u64) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let in_memory = path.as_os_str() == IN_MEMORY_PATH;

        let mut connection = if in_memory {
            Connection::open_in_memory()
        } else {
            if path.is_dir() {
                return Err(CatalogError::unavailable(
                    KIND,
                    format!("{} is a directory", path.display()),
                ));
            }
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
            Connection::open_with_flags(&path, flags)
        }
        .map_err(|e| CatalogError::unavailable(KIND, format!("{}: {e}", path.display())))?;

        apply_pragmas(&connection, busy_timeout_ms, !in_memory).map_err(|e| unavailable(&e))?;
        initialize_schema(&mut connection).map_err(|e| unavailable(&e))?;

        tracing::debug!(path = %path.display(), "relational catalog schema ready");
        Ok(Self {
            path,
            connection: Mutex::new(connection),
        })
    }

    /// Database path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogBackend for SqliteBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn location(&self) -> Option<String> {
        Some(self.path.display().to_string())
    }

    fn load(&self) -> Result<Loaded, CatalogError> {
        let mut guard = self.connection.lock();
        let tx = guard.transaction().map_err(|e| unavailable(&e))?;
        let loaded = load_products(&tx)?;
        tx.commit().map_err(|e| classify(&e))?;
        Ok(loaded)
    }

    fn replace(&self, plan: BatchPlanner<'_>) -> Result<Vec<Product>, CatalogError> {
        let mut guard = self.connection.lock();
        let tx = guard.transaction().map_err(|e| unavailable(&e))?;

        let previous_high_water = read_high_water(&tx)?;
        let (scan, created): (IdScan, HashMap<String, String>) = match scan_existing(&tx) {
            Ok((ids, created)) => (
                Ok(IdSnapshot {
                    ids,
                    high_water: previous_high_water,
                }),
                created,
            ),
            Err(e) => (Err(e), HashMap::new()),
        };
        let batch = plan(scan);

        tx.execute("DELETE FROM data_product_tags", [])
            .map_err(|e| classify(&e))?;
        let removed = tx
            .execute("DELETE FROM data_products", [])
            .map_err(|e| classify(&e))?;

        let now = chrono::Utc::now().to_rfc3339();
        insert_batch(&tx, &batch, &created, &now)?;

        let high_water = max_sequence(batch.iter().map(|p| p.id.as_str()))
            .unwrap_or(0)
            .max(previous_high_water);
        tx.execute(
            "INSERT INTO catalog_sequence (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = MAX(value, excluded.value)",
            params![SEQUENCE_NAME, i64::try_from(high_water).unwrap_or(i64::MAX)],
        )
        .map_err(|e| classify(&e))?;

        tx.commit().map_err(|e| classify(&e))?;
        tracing::debug!(
            removed,
            inserted = batch.len(),
            high_water,
            "relational replace committed"
        );
        Ok(batch)
    }

    fn count(&self) -> Result<usize, CatalogError> {
        // Rows `load` would skip are not counted.
        Ok(self.load()?.products.len())
    }
}

fn apply_pragmas(
    connection: &Connection,
    busy_timeout_ms: u64,
    write_ahead_log: bool,
) -> rusqlite::Result<()> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    if write_ahead_log {
        connection.execute_batch("PRAGMA journal_mode = wal;")?;
    }
    connection.busy_timeout(Duration::from_millis(busy_timeout_ms))
}

fn initialize_schema(connection: &mut Connection) -> rusqlite::Result<()> {
    let descriptive: String = ATTRIBUTE_COLUMNS[1..]
        .iter()
        .map(|column| format!("\"{column}\" TEXT,\n"))
        .collect();
    let tx = connection.transaction()?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS data_products (
            id TEXT PRIMARY KEY,
            \"name\" TEXT NOT NULL,
            {descriptive}
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS data_product_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id TEXT NOT NULL REFERENCES data_products(id) ON DELETE CASCADE,
            tag TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_data_product_tags_product
            ON data_product_tags (product_id);
        CREATE TABLE IF NOT EXISTS catalog_sequence (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );"
    ))?;
    tx.commit()
}

fn quoted_columns() -> String {
    ATTRIBUTE_COLUMNS
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Readable stored ids and each row's `created_at`
///
/// Rows whose id cannot be read are left out; they cannot collide with a
/// generated id.
fn scan_existing(
    tx: &Transaction<'_>,
) -> Result<(HashSet<String>, HashMap<String, String>), CatalogError> {
    let mut stmt = tx
        .prepare("SELECT id, created_at FROM data_products")
        .map_err(|e| classify(&e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0).ok(), row.get::<_, String>(1).ok()))
        })
        .map_err(|e| classify(&e))?;

    let mut ids = HashSet::new();
    let mut created = HashMap::new();
    for row in rows {
        match row.map_err(|e| classify(&e))? {
            (Some(id), created_at) => {
                ids.insert(id.clone());
                if let Some(created_at) = created_at {
                    created.insert(id, created_at);
                }
            }
            (None, _) => tracing::warn!(backend = KIND, "ignoring row with unreadable id"),
        }
    }
    Ok((ids, created))
}

/// Persisted high-water mark, 0 when never written
fn read_high_water(tx: &Transaction<'_>) -> Result<u64, CatalogError> {
    let stored: Option<i64> = tx
        .query_row(
            "SELECT value FROM catalog_sequence WHERE name = ?1",
            params![SEQUENCE_NAME],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| classify(&e))?;
    Ok(stored.map_or(0, |v| u64::try_from(v).unwrap_or_default()))
}

fn insert_batch(
    tx: &Transaction<'_>,
    batch: &[Product],
    created: &HashMap<String, String>,
    now: &str,
) -> Result<(), CatalogError> {
    let placeholders = (1..=ATTRIBUTE_COUNT + 3)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut product_stmt = tx
        .prepare(&format!(
            "INSERT INTO data_products (id, {}, created_at, updated_at) VALUES ({placeholders})",
            quoted_columns()
        ))
        .map_err(|e| classify(&e))?;
    let mut tag_stmt = tx
        .prepare("INSERT INTO data_product_tags (product_id, tag) VALUES (?1, ?2)")
        .map_err(|e| classify(&e))?;

    for product in batch {
        let created_at = created.get(&product.id).map_or(now, String::as_str);
        let mut values: Vec<&str> = Vec::with_capacity(ATTRIBUTE_COUNT + 3);
        values.push(&product.id);
        values.extend(product.attributes.column_values());
        values.push(created_at);
        values.push(now);
        product_stmt
            .execute(params_from_iter(values))
            .map_err(|e| classify(&e))?;

        for tag in &product.tags {
            tag_stmt
                .execute(params![product.id, tag])
                .map_err(|e| classify(&e))?;
        }
    }
    Ok(())
}

fn load_products(tx: &Transaction<'_>) -> Result<Loaded, CatalogError> {
    let mut loaded = Loaded::default();
    {
        let mut stmt = tx
            .prepare(&format!(
                "SELECT id, {} FROM data_products ORDER BY id",
                quoted_columns()
            ))
            .map_err(|e| unavailable(&e))?;
        let rows = stmt
            .query_map([], |row| Ok(decode_row(row)))
            .map_err(|e| classify(&e))?;
        for (position, row) in rows.enumerate() {
            let (label, decoded) = row.map_err(|e| classify(&e))?;
            match decoded {
                Ok(product) => loaded.products.push(product),
                Err(reason) => {
                    let record = label.unwrap_or_else(|| format!("#{position}"));
                    let err = ReadError::new(record, reason);
                    tracing::warn!(backend = KIND, "{err}");
                    loaded.skipped.push(err);
                }
            }
        }
    }

    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = tx
        .prepare("SELECT product_id, tag FROM data_product_tags ORDER BY id")
        .map_err(|e| classify(&e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0), row.get::<_, String>(1)))
        })
        .map_err(|e| classify(&e))?;
    for row in rows {
        match row.map_err(|e| classify(&e))? {
            (Ok(product_id), Ok(tag)) => tags.entry(product_id).or_default().push(tag),
            (product_id, tag) => {
                tracing::warn!(
                    backend = KIND,
                    product_id = ?product_id.ok(),
                    error = ?tag.err(),
                    "dropping unreadable tag row"
                );
            }
        }
    }
    for product in &mut loaded.products {
        if let Some(list) = tags.remove(&product.id) {
            product.tags = normalize_tags(list);
        }
    }
    Ok(loaded)
}

/// Row id (when readable) and the decoded product or the reason it failed
fn decode_row(row: &Row<'_>) -> (Option<String>, Result<Product, String>) {
    let id = row.get::<_, String>(0).ok();
    (id, decode_product(row))
}

fn decode_product(row: &Row<'_>) -> Result<Product, String> {
    let id: String = row.get(0).map_err(|e| format!("column id: {e}"))?;
    let mut values: [String; ATTRIBUTE_COUNT] = Default::default();
    for (offset, value) in values.iter_mut().enumerate() {
        *value = row
            .get::<_, Option<String>>(offset + 1)
            .map_err(|e| format!("column {}: {e}", ATTRIBUTE_COLUMNS[offset]))?
            .unwrap_or_default();
    }
    let product = Product {
        id,
        attributes: ProductAttributes::from_column_values(values),
        tags: Vec::new(),
    };
    product.check_invariants()?;
    Ok(product)
}

fn unavailable(err: &rusqlite::Error) -> CatalogError {
    CatalogError::unavailable(KIND, err.to_string())
}

/// Map an engine error onto the catalog taxonomy
fn classify(err: &rusqlite::Error) -> CatalogError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => CatalogError::constraint(err.to_string()),
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::PermissionDenied => unavailable(err),
            _ => CatalogError::storage(err.to_string()),
        },
        _ => CatalogError::storage(err.to_string()),
    }
}
