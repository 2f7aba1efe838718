//! Error types for stalecheck
//!
//! All modules use `StalecheckResult<T>` as their return type.
//!
//! Conservative fallbacks (absent image, path with no git history, missing
//! build-version record) are deliberately *not* errors; they are handled
//! in place with a warning and a default. Only conditions the resolver
//! cannot reason about surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stalecheck operations
pub type StalecheckResult<T> = Result<T, StalecheckError>;

/// All errors that can occur in stalecheck
#[derive(Error, Debug)]
pub enum StalecheckError {
    // Catalog errors
    #[error("Failed to scan images directory {path}: {source}")]
    ImagesDirScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown managed image: {0}")]
    UnknownImage(String),

    #[error("Recipe file not found for image {image}: {path}")]
    RecipeNotFound { image: String, path: PathBuf },

    #[error("Base-image cycle detected while resolving {image}: {chain}")]
    BaseChainCycle { image: String, chain: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Target mapping errors
    #[error("Target {target} is not mapped to any image")]
    TargetNotMapped { target: String },

    #[error("Target {target} maps to unknown image {image}")]
    TargetImageUnknown { target: String, image: String },

    #[error("Duplicate target mapping: {target}")]
    DuplicateTarget { target: String },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected output from {command}: {output:?}")]
    UnexpectedToolOutput { command: String, output: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StalecheckError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create an unexpected-tool-output error
    pub fn unexpected_output(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::UnexpectedToolOutput {
            command: command.into(),
            output: output.into(),
        }
    }
}
