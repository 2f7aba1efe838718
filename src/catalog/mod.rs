//! Managed image catalog
//!
//! The catalog is rebuilt from the filesystem on every run: each
//! subdirectory of the images root is one managed image, holding its
//! recipe (`Dockerfile`), dependency-spec files and evidence markers.
//! Records are never mutated after the scan.

pub mod base;

pub use base::{base_chain, declared_base};

use crate::error::{StalecheckError, StalecheckResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A single managed image specification directory
#[derive(Debug, Clone)]
pub struct ImageSpec {
    name: String,
    dir: PathBuf,
}

impl ImageSpec {
    /// Image name (the directory name under the images root)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Specification directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to the recipe file
    pub fn dockerfile(&self) -> PathBuf {
        self.dir.join("Dockerfile")
    }

    /// Git pathspec covering everything in the specification directory
    pub fn pathspec(&self) -> String {
        format!("{}/*", self.dir.display())
    }

    /// Dependency-spec files in the directory, sorted by name
    pub fn requirement_files(&self) -> StalecheckResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| StalecheckError::io(format!("reading {}", self.dir.display()), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| StalecheckError::io(format!("reading {}", self.dir.display()), e))?;
            if entry
                .file_name()
                .to_string_lossy()
                .ends_with("requirements.txt")
            {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// All managed images, keyed by name
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    images: BTreeMap<String, ImageSpec>,
}

impl Catalog {
    /// Scan the images root; every subdirectory becomes a managed image
    pub fn scan(root: impl Into<PathBuf>) -> StalecheckResult<Self> {
        let root = root.into();
        let entries = fs::read_dir(&root).map_err(|e| StalecheckError::ImagesDirScan {
            path: root.clone(),
            source: e,
        })?;

        let mut images = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| StalecheckError::ImagesDirScan {
                path: root.clone(),
                source: e,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            images.insert(
                name.clone(),
                ImageSpec {
                    name,
                    dir: entry.path(),
                },
            );
        }

        Ok(Self { root, images })
    }

    /// Images root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up an image by name
    pub fn get(&self, name: &str) -> StalecheckResult<&ImageSpec> {
        self.images
            .get(name)
            .ok_or_else(|| StalecheckError::UnknownImage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    /// All images in name order
    pub fn iter(&self) -> impl Iterator<Item = &ImageSpec> {
        self.images.values()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
