//! Build-target to image mapping
//!
//! The host engine addresses work by `(task, kind, name)` triples; each
//! triple is pinned to a managed image up front. The whole table is
//! validated eagerly against the catalog at construction so a typo in a
//! mapping fails the run immediately instead of surfacing mid-walk.

use crate::catalog::Catalog;
use crate::error::{StalecheckError, StalecheckResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of build target a mapping entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Dataset,
    Method,
    Metric,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset => write!(f, "dataset"),
            Self::Method => write!(f, "method"),
            Self::Metric => write!(f, "metric"),
        }
    }
}

/// Identifier of a single build target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId {
    pub task: String,
    pub kind: TargetKind,
    pub name: String,
}

impl TargetId {
    pub fn new(task: impl Into<String>, kind: TargetKind, name: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.task, self.kind, self.name)
    }
}

/// One declared mapping, as it appears in the `[[targets]]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    pub task: String,
    pub kind: TargetKind,
    pub name: String,
    pub image: String,
}

/// Validated lookup table from target identifiers to managed image names
#[derive(Debug, Clone, Default)]
pub struct TargetMap {
    entries: HashMap<TargetId, String>,
}

impl TargetMap {
    /// Build the table, checking every referenced image against the catalog
    /// and rejecting duplicate target identifiers.
    pub fn from_entries(
        entries: impl IntoIterator<Item = TargetEntry>,
        catalog: &Catalog,
    ) -> StalecheckResult<Self> {
        let mut map = HashMap::new();
        for entry in entries {
            let id = TargetId::new(entry.task, entry.kind, entry.name);
            if !catalog.contains(&entry.image) {
                return Err(StalecheckError::TargetImageUnknown {
                    target: id.to_string(),
                    image: entry.image,
                });
            }
            if map.insert(id.clone(), entry.image).is_some() {
                return Err(StalecheckError::DuplicateTarget {
                    target: id.to_string(),
                });
            }
        }
        Ok(Self { entries: map })
    }

    /// The image a target is pinned to
    pub fn image_for(&self, target: &TargetId) -> StalecheckResult<&str> {
        self.entries
            .get(target)
            .map(String::as_str)
            .ok_or_else(|| StalecheckError::TargetNotMapped {
                target: target.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
