//! Configuration management for stalecheck

pub mod schema;

pub use schema::Config;

use crate::error::{StalecheckError, StalecheckResult};
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration, falling back to defaults if the file is missing
    pub fn load(path: &Path) -> StalecheckResult<Config> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| StalecheckError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| StalecheckError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Registry push credentials from the configured environment variable,
    /// if set. Consumed by the push executor, not by the resolver.
    pub fn registry_password(&self) -> Option<String> {
        std::env::var(&self.registry.password_env)
            .ok()
            .filter(|value| !value.is_empty())
    }
}
