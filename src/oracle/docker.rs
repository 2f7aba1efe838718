//! Docker-backed container registry age oracle
//!
//! Creation times come from `docker inspect`; remote existence from
//! `docker manifest inspect`. When a local inspect fails but the image
//! exists remotely, the oracle pulls it once and re-inspects exactly once
//! more. An image absent everywhere reads as [`ABSENT`].

use crate::error::{StalecheckError, StalecheckResult};
use crate::oracle::{RegistryOracle, Timestamp, ABSENT};
use chrono::NaiveDateTime;
use std::process::{Command, Output, Stdio};
use tracing::{debug, info, warn};

/// Registry oracle backed by the `docker` CLI
pub struct DockerCli {
    namespace: String,
}

impl DockerCli {
    /// Create an oracle for images published under `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Full registry reference for an image name
    fn reference(&self, image: &str) -> String {
        format!("{}/{}", self.namespace, image)
    }

    /// Execute a docker command and return the output
    fn exec(&self, args: &[&str], envs: &[(&str, &str)]) -> StalecheckResult<Output> {
        debug!("Executing: docker {:?}", args);

        Command::new("docker")
            .args(args)
            .envs(envs.iter().copied())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| StalecheckError::command_failed(format!("docker {:?}", args), e))
    }

    /// Pull an image. A failed pull is only a warning; the caller
    /// re-inspects and falls back from there.
    fn pull(&self, image: &str) -> StalecheckResult<()> {
        let reference = self.reference(image);
        info!("Pulling image: {}", reference);

        let output = self.exec(&["pull", "--quiet", &reference], &[])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Failed to pull {}: {}", reference, stderr.trim());
        }
        Ok(())
    }

    fn age_with_retry(&self, image: &str, pull_on_error: bool) -> StalecheckResult<Timestamp> {
        let reference = self.reference(image);
        let output = self.exec(&["inspect", "-f", "{{.Created}}", &reference], &[])?;
        let raw = String::from_utf8_lossy(&output.stdout)
            .trim()
            .trim_matches('"')
            .to_string();

        if let Some(ts) = parse_created(&raw) {
            return Ok(ts);
        }
        if pull_on_error && self.exists(image, false)? {
            self.pull(image)?;
            return self.age_with_retry(image, false);
        }
        if raw.is_empty() {
            warn!(
                "Image {} not found locally or remotely; assuming it needs a build",
                reference
            );
            return Ok(ABSENT);
        }
        Err(StalecheckError::unexpected_output("docker inspect", raw))
    }
}

impl RegistryOracle for DockerCli {
    fn age_of(&self, image: &str) -> StalecheckResult<Timestamp> {
        self.age_with_retry(image, true)
    }

    fn exists(&self, image: &str, local: bool) -> StalecheckResult<bool> {
        let reference = self.reference(image);
        let output = if local {
            self.exec(&["inspect", &reference], &[])?
        } else {
            self.exec(
                &["manifest", "inspect", &reference],
                &[("DOCKER_CLI_EXPERIMENTAL", "enabled")],
            )?
        };
        Ok(output.status.success())
    }
}

/// Parse a `{{.Created}}` value, ignoring fractional seconds and the
/// zone suffix. Returns `None` for anything that is not a creation time.
fn parse_created(raw: &str) -> Option<Timestamp> {
    let trimmed = raw.split('.').next().unwrap_or(raw).trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}
