//! Code-version gate
//!
//! One process-wide question, answered once per run: has the managed
//! codebase's version advanced past the version recorded at the last
//! successful build? An open gate forces the rebuild path for every
//! image. Missing or unreadable records open the gate; skipping a needed
//! rebuild is worse than repeating one.

use crate::error::{StalecheckError, StalecheckResult};
use semver::Version;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

/// Whether the codebase has changed since the last recorded build
#[derive(Debug, Clone, Copy)]
pub struct VersionGate {
    changed: bool,
}

impl VersionGate {
    /// Compare the persisted build-version record against the running
    /// codebase's version.
    pub fn evaluate(record: &Path, current: &Version) -> StalecheckResult<Self> {
        let recorded = match fs::read_to_string(record) {
            Ok(contents) => contents.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "No build-version record at {}; assuming codebase changed",
                    record.display()
                );
                return Ok(Self::open());
            }
            Err(e) => {
                return Err(StalecheckError::io(
                    format!("reading build-version record {}", record.display()),
                    e,
                ))
            }
        };

        match Version::parse(&recorded) {
            Ok(version) => Ok(Self {
                changed: *current > version,
            }),
            Err(e) => {
                warn!(
                    "Unparseable build-version record {:?} at {}: {}; assuming codebase changed",
                    recorded,
                    record.display(),
                    e
                );
                Ok(Self::open())
            }
        }
    }

    /// A gate that is open: codebase considered changed
    pub fn open() -> Self {
        Self { changed: true }
    }

    /// A gate that is closed: codebase considered unchanged
    pub fn closed() -> Self {
        Self { changed: false }
    }

    /// True iff the codebase has advanced since the last build
    pub fn is_open(&self) -> bool {
        self.changed
    }

    /// Write the record after a successful build
    pub fn record(path: &Path, version: &Version) -> StalecheckResult<()> {
        fs::write(path, format!("{version}\n")).map_err(|e| {
            StalecheckError::io(
                format!("writing build-version record {}", path.display()),
                e,
            )
        })
    }
}
