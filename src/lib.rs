//! Stalecheck - staleness resolver for managed container image chains
//!
//! Given a tree of image specification directories whose recipes may build
//! on one another, decides per image whether the published artifact needs
//! a full rebuild, a lightweight code refresh, or a from-scratch build,
//! and maps that decision to the evidence-marker file the host workflow
//! engine depends on.

pub mod catalog;
pub mod config;
pub mod error;
pub mod marker;
pub mod oracle;
pub mod resolve;
pub mod target;

pub use catalog::{Catalog, ImageSpec};
pub use config::Config;
pub use error::{StalecheckError, StalecheckResult};
pub use marker::{clear_markers, Marker};
pub use oracle::{DockerCli, GitCli, RegistryOracle, Timestamp, VcsOracle, ABSENT};
pub use resolve::{classify, Decision, Resolution, Resolver, VersionGate};
pub use target::{TargetEntry, TargetId, TargetKind, TargetMap};
