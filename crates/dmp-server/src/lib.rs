//! DMP Server - HTTP surface for the data product catalog
//!
//! - [`config`]: TOML + environment configuration
//! - [`router`]: axum router with CORS, tracing, timeouts, static front end
//! - [`identity`]: caller resolution from reverse-proxy headers
//! - [`server`]: bind and serve with graceful shutdown

#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{AuthConfig, ConfigError, CorsConfig, Environment, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use identity::{ForwardedHeaders, IdentityProvider, UserInfo};
pub use logging::{init_logging, LogFormat};
pub use router::build_router;
pub use server::serve;
pub use state::AppState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
