//! Typed error handling for verification runs.
//!
//! Errors are split by how far they reach:
//! - Source errors (missing or non-text input) stop the run before any output exists
//! - Check errors stay local to one candidate and turn into a rejection
//! - Output errors stop the run after a best-effort flush of what was written

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while loading the input file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input file is missing or cannot be read.
    #[error("Unable to read input file {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input cannot be split into text records at all.
    #[error("Input is not a text file of addresses (line {line}): {reason}")]
    Format { line: usize, reason: String },
}

/// Errors a single check can raise for a single candidate.
///
/// Neither variant aborts a run: the policy converts them into rejections.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    /// A transient failure such as a DNS timeout or an unreachable resolver.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// An unexpected failure inside the check itself.
    #[error("Internal check failure: {0}")]
    Internal(String),
}

impl CheckError {
    /// Returns `true` if retrying the same candidate later could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors that end a verification run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Output files could not be created or written. Files already opened
    /// are flushed before this is returned and may hold partial results.
    #[error(
        "Failed to write results to {} (partial output may remain): {source}",
        path.display()
    )]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("EMPATH_VERIFY_CONFIG points to non-existent file: {}", .0.display())]
    MissingEnvPath(PathBuf),
}
