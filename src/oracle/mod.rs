//! External capability oracles
//!
//! The resolver talks to version control and the container registry
//! through two narrow traits so tests can substitute fakes without
//! invoking real tools. The CLI-backed implementations live in
//! [`git`] and [`docker`]; both are blocking process invocations.

pub mod docker;
pub mod git;

pub use docker::DockerCli;
pub use git::GitCli;

use crate::error::StalecheckResult;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Sentinel registry age for an artifact that does not exist anywhere.
/// Lower than any real timestamp.
pub const ABSENT: Timestamp = -1;

/// Last-change times from version control
pub trait VcsOracle: Send + Sync {
    /// Last-change time of a pathspec.
    ///
    /// Paths with uncommitted changes read as the current wall-clock time;
    /// paths with no history at all read as `0`.
    fn age_of(&self, pathspec: &str) -> StalecheckResult<Timestamp>;
}

/// Published-artifact state from the container registry
pub trait RegistryOracle: Send + Sync {
    /// Creation time of the published artifact, or [`ABSENT`] when the
    /// image exists neither locally nor remotely.
    fn age_of(&self, image: &str) -> StalecheckResult<Timestamp>;

    /// Whether the artifact exists locally (`local = true`) or remotely.
    fn exists(&self, image: &str, local: bool) -> StalecheckResult<bool>;
}
