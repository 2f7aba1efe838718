//! Staleness resolution
//!
//! Combines the base-chain walk, the two age oracles and the code-version
//! gate into a three-way decision per image, memoized for the run. The
//! host engine asks [`Resolver::marker_for`] "what evidence file proves
//! this image is current?" and turns the answer into a build target.

pub mod cache;
pub mod version_gate;

pub use cache::ResolutionCache;
pub use version_gate::VersionGate;

use crate::catalog::{base, Catalog};
use crate::error::StalecheckResult;
use crate::marker::Marker;
use crate::oracle::{RegistryOracle, Timestamp, VcsOracle, ABSENT};
use chrono::DateTime;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// What an image needs to be considered current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Recipe or codebase moved ahead of the published artifact
    Rebuild,
    /// Artifact is current; only a lightweight code-sync is needed
    Refresh,
    /// Artifact exists nowhere; build from scratch
    MissingBuild,
}

impl Decision {
    /// Evidence-marker class this decision maps to.
    /// A missing build needs the same action as a rebuild.
    pub fn marker(self) -> Marker {
        match self {
            Self::Rebuild | Self::MissingBuild => Marker::Build,
            Self::Refresh => Marker::Update,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rebuild => write!(f, "rebuild"),
            Self::Refresh => write!(f, "refresh"),
            Self::MissingBuild => write!(f, "missing-build"),
        }
    }
}

/// The decision rule, as a pure function of its five inputs.
///
/// [`ABSENT`] is excluded from the timestamp comparison: an artifact that
/// does not exist is classified by the existence probes, not by its age,
/// so it lands in [`Decision::MissingBuild`] rather than
/// [`Decision::Rebuild`].
pub fn classify(
    spec_age: Timestamp,
    reg_age: Timestamp,
    code_changed: bool,
    exists_local: bool,
    exists_remote: bool,
) -> Decision {
    if code_changed || (reg_age != ABSENT && spec_age > reg_age) {
        Decision::Rebuild
    } else if exists_local || exists_remote {
        Decision::Refresh
    } else {
        Decision::MissingBuild
    }
}

/// A resolved decision together with its evidence-marker path
#[derive(Debug, Clone)]
pub struct Resolution {
    pub decision: Decision,
    pub marker: PathBuf,
}

/// The staleness resolver for one run
///
/// Owns the per-run memoization; construct a fresh one per run so
/// decisions are recomputed against current state. Safe to share across
/// worker threads.
pub struct Resolver {
    catalog: Catalog,
    namespace: String,
    vcs: Arc<dyn VcsOracle>,
    registry: Arc<dyn RegistryOracle>,
    gate: VersionGate,
    cache: ResolutionCache<Resolution>,
}

impl Resolver {
    pub fn new(
        catalog: Catalog,
        namespace: impl Into<String>,
        vcs: Arc<dyn VcsOracle>,
        registry: Arc<dyn RegistryOracle>,
        gate: VersionGate,
    ) -> Self {
        Self {
            catalog,
            namespace: namespace.into(),
            vcs,
            registry,
            gate,
            cache: ResolutionCache::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Evidence-marker path proving `image` is current.
    /// Host-engine entry point.
    pub fn marker_for(&self, image: &str) -> StalecheckResult<PathBuf> {
        Ok(self.resolve(image)?.marker)
    }

    /// Memoized decision for `image`; oracles run at most once per image
    /// per run, even under concurrent first access.
    pub fn resolve(&self, image: &str) -> StalecheckResult<Resolution> {
        self.cache
            .get_or_try_insert_with(image, || self.resolve_uncached(image))
    }

    fn resolve_uncached(&self, image: &str) -> StalecheckResult<Resolution> {
        let spec_age = self.spec_age(image)?;
        let reg_age = self.registry.age_of(image)?;
        let code_changed = self.gate.is_open();

        info!(
            "{}: recipe changed {}; artifact created {}",
            image,
            format_timestamp(spec_age),
            format_timestamp(reg_age)
        );

        // Existence only matters once the rebuild arm has not fired;
        // skipping the probes then keeps oracle traffic minimal.
        let stale = code_changed || (reg_age != ABSENT && spec_age > reg_age);
        let (exists_local, exists_remote) = if stale {
            (false, false)
        } else {
            let local = self.registry.exists(image, true)?;
            let remote = if local {
                false
            } else {
                self.registry.exists(image, false)?
            };
            (local, remote)
        };

        let decision = classify(spec_age, reg_age, code_changed, exists_local, exists_remote);
        match decision {
            Decision::Rebuild => info!("{}: rebuilding", image),
            Decision::Refresh => info!("{}: refreshing source code only", image),
            Decision::MissingBuild => info!("{}: building", image),
        }

        let spec = self.catalog.get(image)?;
        Ok(Resolution {
            decision,
            marker: decision.marker().path(spec.dir()),
        })
    }

    /// Specification age: the most recent recipe change anywhere in the
    /// base chain. Monotonic along the chain by construction.
    pub fn spec_age(&self, image: &str) -> StalecheckResult<Timestamp> {
        let chain = base::base_chain(&self.catalog, image, &self.namespace)?;
        let mut age = 0;
        for name in &chain {
            let spec = self.catalog.get(name)?;
            age = age.max(self.vcs.age_of(&spec.pathspec())?);
        }
        Ok(age)
    }

    /// Transitive watch-set for `image`: every file whose change must
    /// invalidate its decision on a future run. With `include_self` the
    /// image's own evidence marker is included; ancestors always
    /// contribute theirs.
    pub fn requirements(&self, image: &str, include_self: bool) -> StalecheckResult<Vec<PathBuf>> {
        let chain = base::base_chain(&self.catalog, image, &self.namespace)?;
        let mut files = Vec::new();
        for (depth, name) in chain.iter().enumerate() {
            let spec = self.catalog.get(name)?;
            files.push(spec.dockerfile());
            files.extend(spec.requirement_files()?);
            if include_self || depth > 0 {
                files.push(self.resolve(name)?.marker);
            }
        }
        Ok(files)
    }
}

/// Format a unix timestamp for the diagnostic lines
pub fn format_timestamp(ts: Timestamp) -> String {
    if ts == ABSENT {
        return "never".to_string();
    }
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
