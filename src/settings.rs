//! Process settings from the environment.

use crate::config::{builtin, load_from_path, resolve, ResolvedCatalog};
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/app_catalog";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    /// Overrides the schema named in the catalog document.
    pub schema: Option<String>,
    /// Catalog document to load instead of the builtin one.
    pub catalog_path: Option<PathBuf>,
    pub statement_timeout: Option<Duration>,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Validation(format!("DATABASE_MAX_CONNECTIONS: invalid value '{}'", v)))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let statement_timeout = match get("CATALOG_STATEMENT_TIMEOUT_MS") {
            Some(v) => Some(Duration::from_millis(v.parse::<u64>().map_err(|_| {
                ConfigError::Validation(format!("CATALOG_STATEMENT_TIMEOUT_MS: invalid value '{}'", v))
            })?)),
            None => None,
        };

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            max_connections,
            schema: get("CATALOG_SCHEMA"),
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            statement_timeout,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
        })
    }

    /// Catalog from `catalog_path` (or the builtin one), with the schema override applied.
    pub async fn load_catalog(&self) -> Result<ResolvedCatalog, ConfigError> {
        let catalog = match &self.catalog_path {
            Some(path) => resolve(&load_from_path(path).await?)?,
            None => builtin()?,
        };
        Ok(match &self.schema {
            Some(schema) => catalog.with_schema(schema),
            None => catalog,
        })
    }
}
