//! Evidence markers
//!
//! Empty files whose presence and mtime are the build-system contract:
//! one per decision class plus one each for "has been pulled" and "has
//! been pushed", all living in the image's specification directory. The
//! host engine depends on them as filesystem build targets; the resolver
//! only names them.

use crate::catalog::Catalog;
use crate::error::{StalecheckError, StalecheckResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Evidence-marker classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Needs a full build
    Build,
    /// Needs a code refresh only
    Update,
    /// Registry copy has been pulled
    Pull,
    /// Registry copy has been pushed
    Push,
}

impl Marker {
    pub const ALL: [Marker; 4] = [Self::Build, Self::Update, Self::Pull, Self::Push];

    /// Marker file name inside an image directory
    pub fn filename(self) -> &'static str {
        match self {
            Self::Build => ".docker_build",
            Self::Update => ".docker_update",
            Self::Pull => ".docker_pull",
            Self::Push => ".docker_push",
        }
    }

    /// Marker path for a given image directory
    pub fn path(self, image_dir: &Path) -> PathBuf {
        image_dir.join(self.filename())
    }
}

/// Marker paths of one class for every image in the catalog, in name order
pub fn all_paths(catalog: &Catalog, marker: Marker) -> Vec<PathBuf> {
    catalog.iter().map(|spec| marker.path(spec.dir())).collect()
}

/// Remove every marker for every image, forcing fresh evaluation.
///
/// Called by the host engine at process start; absent markers are fine.
pub fn clear_markers(catalog: &Catalog) -> StalecheckResult<()> {
    for spec in catalog.iter() {
        for marker in Marker::ALL {
            let path = marker.path(spec.dir());
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale marker {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StalecheckError::io(
                        format!("removing marker {}", path.display()),
                        e,
                    ))
                }
            }
        }
    }
    Ok(())
}
