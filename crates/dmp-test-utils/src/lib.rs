//! Testing utilities for the DMP workspace
//!
//! Shared fixtures, store builders for every backend, and logging setup.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use dmp_model::ProductInput;
use dmp_store::{CatalogStore, MemoryBackend, StoreConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Initialize test logging; safe to call from every test
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dmp=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Backend a fixture store runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureBackend {
    Relational,
    FlatFile,
    InMemory,
}

impl FixtureBackend {
    pub const ALL: [Self; 3] = [Self::Relational, Self::FlatFile, Self::InMemory];
}

/// A store plus whatever keeps its medium alive
#[derive(Debug)]
pub struct StoreFixture {
    pub store: CatalogStore,
    pub backend: FixtureBackend,
    /// Handle for toggling availability (in-memory only)
    pub memory: Option<MemoryBackend>,
    pub dir: Option<TempDir>,
}

impl StoreFixture {
    /// Fresh, empty store on `backend`
    pub fn new(backend: FixtureBackend) -> Self {
        match backend {
            FixtureBackend::Relational => {
                let dir = TempDir::new().unwrap();
                let store =
                    CatalogStore::open(&StoreConfig::relational(dir.path().join("catalog.db")))
                        .unwrap();
                Self {
                    store,
                    backend,
                    memory: None,
                    dir: Some(dir),
                }
            }
            FixtureBackend::FlatFile => {
                let dir = TempDir::new().unwrap();
                let store = CatalogStore::open(&StoreConfig::flat_file(
                    dir.path().join("dataProducts.json"),
                ))
                .unwrap();
                Self {
                    store,
                    backend,
                    memory: None,
                    dir: Some(dir),
                }
            }
            FixtureBackend::InMemory => {
                let memory = MemoryBackend::new();
                Self {
                    store: CatalogStore::with_backend(Box::new(memory.clone())),
                    backend,
                    memory: Some(memory),
                    dir: None,
                }
            }
        }
    }

    /// Reopen the same medium as a new store
    ///
    /// In-memory fixtures share state with the original handle.
    pub fn reopen(&self) -> CatalogStore {
        match (&self.dir, &self.memory) {
            (_, Some(memory)) => CatalogStore::with_backend(Box::new(memory.clone())),
            (Some(dir), None) => {
                let config = match self.backend {
                    FixtureBackend::Relational => {
                        StoreConfig::relational(dir.path().join("catalog.db"))
                    }
                    _ => StoreConfig::flat_file(dir.path().join("dataProducts.json")),
                };
                CatalogStore::open(&config).unwrap()
            }
            (None, None) => unreachable!("fixture without a medium"),
        }
    }
}

/// One fixture per backend
pub fn all_backends() -> Vec<StoreFixture> {
    FixtureBackend::ALL.into_iter().map(StoreFixture::new).collect()
}

/// Three realistic inputs without ids
pub fn sample_inputs() -> Vec<ProductInput> {
    let mut sales = ProductInput::named("Sales Analytics").with_tags(["sales", "kpi"]);
    sales.attributes.description = "Daily sales by region and channel".to_string();
    sales.attributes.product_type = "Dataset".to_string();
    sales.attributes.domain = "Commercial".to_string();
    sales.attributes.owner = "sales-data@example.com".to_string();
    sales.attributes.classification = "Internal".to_string();

    let mut supply = ProductInput::named("Supply Chain Visibility").with_tags(["supply"]);
    supply.attributes.domain = "Operations".to_string();
    supply.attributes.sub_domain = "Logistics".to_string();
    supply.attributes.gxp = "No".to_string();

    let mut clinical = ProductInput::named("Clinical Trial Outcomes");
    clinical.attributes.certified = "Yes".to_string();
    clinical.attributes.gxp = "Yes".to_string();
    clinical.attributes.data_contract_url = "https://contracts.example.com/ct".to_string();

    vec![sales, supply, clinical]
}

/// Seed document in the legacy shapes (tag strings, `business_function`)
pub fn legacy_seed_json() -> Value {
    json!([
        {
            "id": "DP0001",
            "name": "Customer 360",
            "business_function": "Marketing",
            "tags": "customer, crm"
        },
        {
            "name": "Finance Ledger",
            "domain": "Finance",
            "tags": ["finance", " ledger ", ""]
        }
    ])
}
