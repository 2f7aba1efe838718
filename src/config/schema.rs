//! Configuration schema for stalecheck
//!
//! The host engine points the resolver at its image tree with a small TOML
//! file; every section has defaults so a missing file is usable as-is.

use crate::target::TargetEntry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image tree settings
    pub images: ImagesConfig,

    /// Build-version record settings
    pub version: VersionConfig,

    /// Registry access settings
    pub registry: RegistryConfig,

    /// Target-to-image mapping entries
    pub targets: Vec<TargetEntry>,
}

/// Image tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Root directory containing one subdirectory per managed image
    pub dir: PathBuf,

    /// Registry namespace images are published under; a `FROM` line whose
    /// reference starts with this namespace names a managed base
    pub namespace: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docker"),
            namespace: "localhost".to_string(),
        }
    }
}

/// Build-version record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    /// File holding the codebase version recorded at the last successful build
    pub record: PathBuf,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            record: PathBuf::from("docker/.version"),
        }
    }
}

/// Registry access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Environment variable supplying registry push credentials
    pub password_env: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            password_env: "DOCKER_PASSWORD".to_string(),
        }
    }
}
