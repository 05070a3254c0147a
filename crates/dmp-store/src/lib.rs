//! DMP Store - transactional catalog of data products
//!
//! - [`CatalogStore`]: list, replace-all, add-one, status
//! - [`StoreConfig`] / [`BackendKind`]: explicit backend selection
//! - [`backend`]: relational (`SQLite`), flat JSON file, and in-memory media
//! - [`seed`]: loading a catalog from a seed file
//!
//! Replace-all is all-or-nothing: ids are allocated and the old record set
//! swapped for the new one inside a single backend transaction.

#![allow(missing_docs)]

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod plan;
pub mod seed;

pub use backend::{
    CatalogBackend, FlatFileBackend, IdScan, IdSnapshot, Loaded, MemoryBackend, SqliteBackend,
    StorageStatus,
};
pub use catalog::{CatalogStore, ListReport};
pub use config::{BackendKind, StoreConfig};
pub use error::{CatalogError, ReadError};
pub use plan::plan_batch;
pub use seed::{load_seed_file, parse_seed, seed, SeedMode, SeedReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
