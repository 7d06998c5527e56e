//! Engine configuration from `DYNTABLES_*` environment variables.

use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};
use crate::ident;

pub const ENV_DATABASE_URL: &str = "DYNTABLES_DATABASE_URL";
pub const ENV_CATALOG: &str = "DYNTABLES_CATALOG";
pub const ENV_SEARCH_CONFIG: &str = "DYNTABLES_SEARCH_CONFIG";
pub const ENV_LOG: &str = "DYNTABLES_LOG";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub database_url: Option<String>,
    pub catalog_path: PathBuf,
    /// Text-search configuration for `to_tsvector`/`plainto_tsquery`; server default when unset.
    pub search_config: Option<String>,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { database_url: None, catalog_path: PathBuf::from("catalog.json"), search_config: None, log_filter: "info".to_string() }
    }
}

impl EngineConfig {
    pub fn from_env() -> EngineResult<Self> { Self::from_lookup(|k| std::env::var(k).ok()) }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> EngineResult<Self> {
        let non_empty = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();
        cfg.database_url = non_empty(ENV_DATABASE_URL);
        if let Some(p) = non_empty(ENV_CATALOG) { cfg.catalog_path = PathBuf::from(p); }
        if let Some(s) = non_empty(ENV_SEARCH_CONFIG) {
            if !ident::is_valid_identifier(&s) {
                return Err(EngineError::Config(format!("{} must be a text search configuration name, got '{}'", ENV_SEARCH_CONFIG, s)));
            }
            cfg.search_config = Some(s);
        }
        if let Some(f) = non_empty(ENV_LOG) { cfg.log_filter = f; }
        Ok(cfg)
    }

    pub fn require_database_url(&self) -> EngineResult<&str> {
        self.database_url.as_deref().ok_or_else(|| EngineError::Config(format!("{} is not set", ENV_DATABASE_URL)))
    }
}
