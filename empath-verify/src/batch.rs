//! Sequential batch verification
//!
//! The [`BatchValidator`] drains a [`LineSource`] through a
//! [`ValidationPolicy`], routing each candidate to exactly one output stream
//! in input order. One candidate is fully decided before the next begins.

use std::io::Write;

use tracing::{debug, info};

use crate::{
    error::RunError,
    policy::{ValidationPolicy, VerificationOutcome},
    progress::Progress,
    report::OutputStreams,
    source::LineSource,
    stats::RunStatistics,
};

#[derive(Debug)]
pub struct BatchValidator {
    policy: ValidationPolicy,
}

impl BatchValidator {
    #[must_use]
    pub const fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Verify every candidate in `source`.
    ///
    /// Individual check failures never end the run; they only decide which
    /// stream a candidate lands in.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Output`] if a result cannot be written. Both streams
    /// are flushed on a best-effort basis first, so everything decided up to
    /// that point stays on disk.
    pub async fn run<A: Write, R: Write>(
        &self,
        source: &LineSource,
        outputs: &mut OutputStreams<A, R>,
        progress: &mut dyn Progress,
    ) -> Result<RunStatistics, RunError> {
        let mut stats = RunStatistics::start();
        progress.start(source.len());

        let result = self.drain(source, outputs, progress, &mut stats).await;
        progress.finish();

        if let Err(err) = result {
            outputs.flush_best_effort();
            return Err(err);
        }

        stats.finish();
        info!(
            processed = stats.processed,
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Verification run complete"
        );

        Ok(stats)
    }

    async fn drain<A: Write, R: Write>(
        &self,
        source: &LineSource,
        outputs: &mut OutputStreams<A, R>,
        progress: &mut dyn Progress,
        stats: &mut RunStatistics,
    ) -> Result<(), RunError> {
        for candidate in source.candidates() {
            let outcome = self.policy.evaluate(&candidate.address).await;

            match &outcome {
                VerificationOutcome::Accepted => outputs.write_accepted(&candidate.address)?,
                VerificationOutcome::Rejected(rejection) => {
                    debug!(
                        line = candidate.line,
                        reason = %rejection.reason,
                        detail = %rejection.detail,
                        "Rejected"
                    );
                    outputs.write_rejected(&candidate.address, rejection.reason)?;
                }
            }

            stats.record(&outcome);
            progress.advance(1);
        }

        outputs.flush()
    }
}
