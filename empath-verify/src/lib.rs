//! Batch email address verification.
//!
//! Reads a file of candidate addresses, runs each one through an ordered
//! [`ValidationPolicy`] and sorts it into `goodEmails.csv` or `badEmails.csv`,
//! finishing with a `summary.txt` of the run.

pub mod batch;
pub mod check;
pub mod config;
pub mod dns;
pub mod error;
pub mod policy;
pub mod progress;
pub mod report;
pub mod source;
pub mod stats;

use std::{path::Path, sync::Arc};

use tracing::info;

pub use batch::BatchValidator;
pub use check::{Check, CheckKind, CheckResult, Reason};
pub use config::VerifyConfig;
pub use dns::{DnsResolver, HickoryDnsResolver};
pub use error::{CheckError, ConfigError, RunError, SourceError};
pub use policy::{Rejection, ValidationPolicy, VerificationOutcome};
pub use progress::{LogProgress, NoProgress, Progress};
pub use report::OutputDir;
pub use source::LineSource;
pub use stats::RunStatistics;

/// Verify the addresses in `input`, writing results into
/// `config.output_dir`.
///
/// The input is loaded and validated before anything is written, so a missing
/// or binary input file leaves the output directory untouched.
///
/// # Errors
///
/// Returns [`RunError::Source`] if the input cannot be loaded, and
/// [`RunError::Output`] if results cannot be written.
pub async fn verify_file(
    config: &VerifyConfig,
    input: &Path,
    resolver: Arc<dyn DnsResolver>,
    progress: &mut dyn Progress,
) -> Result<RunStatistics, RunError> {
    let policy = ValidationPolicy::from_kinds(&config.checks, resolver, config.dns.timeout());
    verify_file_with(config, input, policy, progress).await
}

/// [`verify_file`] with a caller-supplied policy.
///
/// # Errors
///
/// See [`verify_file`].
pub async fn verify_file_with(
    config: &VerifyConfig,
    input: &Path,
    policy: ValidationPolicy,
    progress: &mut dyn Progress,
) -> Result<RunStatistics, RunError> {
    let source = LineSource::from_path(input)?;
    info!(
        input = %input.display(),
        candidates = source.len(),
        "Loaded input"
    );

    let output = OutputDir::create(&config.output_dir)?;
    let mut streams = output.open_streams()?.record_reasons(config.record_reasons);

    let stats = BatchValidator::new(policy)
        .run(&source, &mut streams, progress)
        .await?;

    output.write_summary(&stats)?;
    info!(output = %output.root().display(), "Results written");

    Ok(stats)
}
