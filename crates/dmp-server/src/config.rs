//! Server configuration
//!
//! Resolution order:
//! 1. built-in defaults
//! 2. optional TOML file (`--config`)
//! 3. environment overrides (`DMP_*`, plus `DATABRICKS_APP_PORT` and
//!    `ENVIRONMENT` as set by the hosting platform)

use crate::logging::LogFormat;
use dmp_store::{BackendKind, CatalogError, StoreConfig};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default listen port when the platform sets none
pub const DEFAULT_PORT: u16 = 8000;

/// Default flat-file catalog location
pub const DEFAULT_CATALOG_FILE: &str = "dataProducts.json";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] CatalogError),
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Write authorization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Reject PUT/POST from callers who are not admins
    pub require_admin_for_writes: bool,
    /// Usernames or emails treated as admins (case-insensitive)
    pub admin_users: Vec<String>,
    /// Groups whose members are admins
    pub admin_groups: Vec<String>,
}

/// Production CORS policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `https` origins whose host ends with one of these are allowed
    pub allowed_origin_suffixes: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin_suffixes: vec![
                ".azuredatabricks.net".to_string(),
                ".databricksapps.com".to_string(),
            ],
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub environment: Environment,
    pub request_timeout_secs: u64,
    /// Built front end to serve, with `index.html` as SPA fallback
    pub static_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            environment: Environment::Development,
            request_timeout_secs: 30,
            static_dir: None,
            log_format: LogFormat::Pretty,
            store: StoreConfig::flat_file(DEFAULT_CATALOG_FILE),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional file, then the process environment
    ///
    /// # Errors
    /// Unreadable or unparsable file, bad environment values, or a
    /// configuration that fails [`Self::validate`]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    ///
    /// # Errors
    /// I/O or parse failure
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Apply overrides from `lookup`
    ///
    /// # Errors
    /// [`ConfigError::Env`] naming the first unparsable variable
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("DMP_BIND") {
            self.bind = parse_env("DMP_BIND", &bind)?;
        }
        if let Some(port) = get("DATABRICKS_APP_PORT") {
            self.bind.set_port(parse_env("DATABRICKS_APP_PORT", &port)?);
        }
        if let Some(env) = get("DMP_ENVIRONMENT") {
            self.environment = parse_env("DMP_ENVIRONMENT", &env)?;
        } else if let Some(env) = get("ENVIRONMENT") {
            self.environment = parse_env("ENVIRONMENT", &env)?;
        }

        let store_path = get("DMP_STORE_PATH").map(PathBuf::from);
        match get("DMP_STORE_KIND") {
            Some(kind) => self.store = store_from_env(&kind, store_path, &self.store)?,
            None => {
                if let Some(path) = store_path {
                    self.store = with_path(&self.store, path)?;
                }
            }
        }

        if let Some(dir) = get("DMP_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(users) = get("DMP_ADMIN_USERS") {
            self.auth.admin_users = split_list(&users);
        }
        if let Some(groups) = get("DMP_ADMIN_GROUPS") {
            self.auth.admin_groups = split_list(&groups);
        }
        if let Some(format) = get("DMP_LOG_FORMAT") {
            self.log_format = parse_env("DMP_LOG_FORMAT", &format)?;
        }
        Ok(())
    }

    /// Reject configurations that cannot run
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] or the store's own validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.environment == Environment::Production
            && self.cors.allowed_origin_suffixes.is_empty()
        {
            tracing::warn!(
                "production CORS has no allowed origin suffixes; browsers will be refused"
            );
        }
        self.store.validate()?;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        message: e.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn store_from_env(
    kind: &str,
    path: Option<PathBuf>,
    current: &StoreConfig,
) -> Result<StoreConfig, ConfigError> {
    let path = path.or_else(|| current.backend.path().map(Path::to_path_buf));
    let missing_path = || ConfigError::Env {
        var: "DMP_STORE_PATH",
        message: format!("required for store kind {kind}"),
    };
    match kind.trim() {
        "relational" => Ok(StoreConfig::relational(path.ok_or_else(missing_path)?)),
        "flat_file" => Ok(StoreConfig::flat_file(path.ok_or_else(missing_path)?)),
        "in_memory" => Ok(StoreConfig::in_memory()),
        other => Err(ConfigError::Env {
            var: "DMP_STORE_KIND",
            message: format!("unknown store kind: {other}"),
        }),
    }
}

fn with_path(current: &StoreConfig, path: PathBuf) -> Result<StoreConfig, ConfigError> {
    let mut config = current.clone();
    match &mut config.backend {
        BackendKind::Relational { path: p, .. } | BackendKind::FlatFile { path: p } => *p = path,
        BackendKind::InMemory => {
            return Err(ConfigError::Env {
                var: "DMP_STORE_PATH",
                message: "in_memory store takes no path; set DMP_STORE_KIND".to_string(),
            })
        }
    }
    Ok(config)
}
