//! Store configuration
//!
//! The backend is chosen explicitly by the caller through [`BackendKind`];
//! the store never inspects the environment.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default `SQLite` busy timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Path that opens a private in-memory relational database
pub const IN_MEMORY_PATH: &str = ":memory:";

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Persistence medium for the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendKind {
    /// Relational tables (`data_products` + `data_product_tags`) in `SQLite`
    Relational {
        path: PathBuf,
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
    /// Single JSON document
    FlatFile { path: PathBuf },
    /// Process memory; contents vanish with the store
    InMemory,
}

impl BackendKind {
    /// Stable label used in logs and status payloads
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Relational { .. } => "relational",
            Self::FlatFile { .. } => "flat_file",
            Self::InMemory => "in_memory",
        }
    }

    /// Backing path, if the medium has one
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Relational { path, .. } | Self::FlatFile { path } => Some(path),
            Self::InMemory => None,
        }
    }
}

/// Catalog store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub backend: BackendKind,
}

impl StoreConfig {
    /// Relational backend at `path`
    #[must_use]
    pub fn relational(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Relational {
                path: path.into(),
                busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            },
        }
    }

    /// Flat JSON document at `path`
    #[must_use]
    pub fn flat_file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::FlatFile { path: path.into() },
        }
    }

    /// In-memory backend
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: BackendKind::InMemory,
        }
    }

    /// Check the configuration can be opened
    ///
    /// # Errors
    /// Returns [`CatalogError::InvalidConfig`] for empty paths or a zero
    /// busy timeout
    pub fn validate(&self) -> Result<(), CatalogError> {
        if let Some(path) = self.backend.path() {
            if path.as_os_str().is_empty() {
                return Err(CatalogError::InvalidConfig(format!(
                    "{} backend requires a path",
                    self.backend.label()
                )));
            }
        }
        if let BackendKind::Relational {
            busy_timeout_ms: 0, ..
        } = self.backend
        {
            return Err(CatalogError::InvalidConfig(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}
