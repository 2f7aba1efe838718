//! Git-backed version-control age oracle
//!
//! Answers "when did this path last meaningfully change" with two git
//! invocations: a porcelain status check for uncommitted changes, then a
//! log lookup for the last commit touching the pathspec. Dirty content is
//! always treated as maximally fresh.

use crate::error::{StalecheckError, StalecheckResult};
use crate::oracle::{Timestamp, VcsOracle};
use chrono::Utc;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tracing::{debug, warn};

/// Version-control oracle backed by the `git` CLI
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Create an oracle running git commands from `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Execute a git command and return the output
    fn exec(&self, args: &[&str]) -> StalecheckResult<Output> {
        debug!("Executing: git {:?}", args);

        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| StalecheckError::command_failed(format!("git {:?}", args), e))
    }

    /// Check if there are staged or unstaged changes under the pathspec.
    /// Untracked files do not count.
    fn has_uncommitted(&self, pathspec: &str) -> StalecheckResult<bool> {
        let output = self.exec(&[
            "status",
            "--porcelain",
            "--untracked-files=no",
            pathspec,
        ])?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }
}

impl VcsOracle for GitCli {
    fn age_of(&self, pathspec: &str) -> StalecheckResult<Timestamp> {
        if self.has_uncommitted(pathspec)? {
            return Ok(Utc::now().timestamp());
        }

        let output = self.exec(&["log", "-1", "--format=%ad", "--date=unix", "--", pathspec])?;
        let raw = String::from_utf8_lossy(&output.stdout);
        interpret_log_output(raw.trim(), pathspec)
    }
}

/// Turn `git log --date=unix` output into a timestamp.
///
/// Empty output means the pathspec has no history: assumed unchanged
/// forever (age `0`), with a warning so operators can tell this apart
/// from real data. Non-empty output that is not an integer is fatal.
fn interpret_log_output(raw: &str, pathspec: &str) -> StalecheckResult<Timestamp> {
    let cleaned = raw.trim_matches('"');
    if cleaned.is_empty() {
        warn!("No git history for {pathspec}; assuming unchanged");
        return Ok(0);
    }
    cleaned
        .parse()
        .map_err(|_| StalecheckError::unexpected_output("git log", raw))
}
