//! Result files
//!
//! A run writes three files into its output directory:
//!
//! - `goodEmails.csv`: accepted addresses, one per line, in input order
//! - `badEmails.csv`: rejected addresses, optionally followed by the reason code
//! - `summary.txt`: run timestamps and totals
//!
//! Fields are quoted CSV-style only when they need it, using the same rule for
//! every write so identical runs produce identical files.

use std::{
    borrow::Cow,
    fmt::Write as _,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{check::Reason, error::RunError, stats::RunStatistics};

pub const ACCEPTED_FILE: &str = "goodEmails.csv";
pub const REJECTED_FILE: &str = "badEmails.csv";
pub const SUMMARY_FILE: &str = "summary.txt";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quote `field` if it contains a quote, comma, whitespace or line break.
#[must_use]
pub fn quote_field(field: &str) -> Cow<'_, str> {
    let needs_quoting = field
        .chars()
        .any(|ch| ch == '"' || ch == ',' || ch.is_whitespace());

    if needs_quoting {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// The accepted and rejected result streams of one run.
///
/// Both streams are buffered. [`OutputStreams::flush`] must be called to
/// observe write errors; dropping the streams flushes them on a best-effort
/// basis.
#[derive(Debug)]
pub struct OutputStreams<A: Write, R: Write> {
    accepted: BufWriter<A>,
    rejected: BufWriter<R>,
    accepted_path: PathBuf,
    rejected_path: PathBuf,
    record_reasons: bool,
}

impl<A: Write, R: Write> OutputStreams<A, R> {
    /// Wrap two writers. The paths are only used to label errors.
    pub fn new(
        accepted: A,
        accepted_path: impl Into<PathBuf>,
        rejected: R,
        rejected_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            accepted: BufWriter::new(accepted),
            rejected: BufWriter::new(rejected),
            accepted_path: accepted_path.into(),
            rejected_path: rejected_path.into(),
            record_reasons: true,
        }
    }

    /// Whether rejected lines carry a second `reason` column.
    #[must_use]
    pub fn record_reasons(mut self, record_reasons: bool) -> Self {
        self.record_reasons = record_reasons;
        self
    }

    /// # Errors
    ///
    /// Returns [`RunError::Output`] if the accepted stream cannot be written.
    pub fn write_accepted(&mut self, address: &str) -> Result<(), RunError> {
        writeln!(self.accepted, "{}", quote_field(address))
            .map_err(|source| output_error(&self.accepted_path, source))
    }

    /// # Errors
    ///
    /// Returns [`RunError::Output`] if the rejected stream cannot be written.
    pub fn write_rejected(&mut self, address: &str, reason: Reason) -> Result<(), RunError> {
        let address = quote_field(address);
        let written = if self.record_reasons {
            writeln!(self.rejected, "{address},{reason}")
        } else {
            writeln!(self.rejected, "{address}")
        };

        written.map_err(|source| output_error(&self.rejected_path, source))
    }

    /// Flush both streams. The rejected stream is flushed even when the
    /// accepted one fails.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Output`] naming the first stream that failed.
    pub fn flush(&mut self) -> Result<(), RunError> {
        let accepted = self
            .accepted
            .flush()
            .map_err(|source| output_error(&self.accepted_path, source));
        let rejected = self
            .rejected
            .flush()
            .map_err(|source| output_error(&self.rejected_path, source));

        accepted.and(rejected)
    }

    /// Flush both streams, logging every failure instead of returning it.
    pub fn flush_best_effort(&mut self) {
        if let Err(source) = self.accepted.flush() {
            warn!("{}", output_error(&self.accepted_path, source));
        }
        if let Err(source) = self.rejected.flush() {
            warn!("{}", output_error(&self.rejected_path, source));
        }
    }

    /// Flush and hand back the underlying writers.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Output`] if a final flush fails.
    pub fn into_inner(self) -> Result<(A, R), RunError> {
        let accepted = self
            .accepted
            .into_inner()
            .map_err(|err| output_error(&self.accepted_path, err.into_error()))?;
        let rejected = self
            .rejected
            .into_inner()
            .map_err(|err| output_error(&self.rejected_path, err.into_error()))?;
        Ok((accepted, rejected))
    }
}

fn output_error(path: &Path, source: io::Error) -> RunError {
    RunError::Output {
        path: path.to_path_buf(),
        source,
    }
}

/// The directory a run writes its results into.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Create the directory (and parents) if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Output`] if the directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, RunError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| output_error(&root, source))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn accepted_path(&self) -> PathBuf {
        self.root.join(ACCEPTED_FILE)
    }

    #[must_use]
    pub fn rejected_path(&self) -> PathBuf {
        self.root.join(REJECTED_FILE)
    }

    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    /// Create (truncating) the accepted and rejected files.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Output`] if either file cannot be created.
    pub fn open_streams(&self) -> Result<OutputStreams<File, File>, RunError> {
        let accepted_path = self.accepted_path();
        let rejected_path = self.rejected_path();

        let accepted =
            File::create(&accepted_path).map_err(|source| output_error(&accepted_path, source))?;
        let rejected =
            File::create(&rejected_path).map_err(|source| output_error(&rejected_path, source))?;

        Ok(OutputStreams::new(
            accepted,
            accepted_path,
            rejected,
            rejected_path,
        ))
    }

    /// Write `summary.txt` for a finished run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Output`] if the file cannot be written.
    pub fn write_summary(&self, stats: &RunStatistics) -> Result<(), RunError> {
        let path = self.summary_path();
        std::fs::write(&path, render_summary(stats)).map_err(|source| output_error(&path, source))
    }
}

/// Render the run summary, one fact per line.
#[must_use]
pub fn render_summary(stats: &RunStatistics) -> String {
    let finished = stats.finished_at.map_or_else(
        || String::from("-"),
        |at| at.format(TIMESTAMP_FORMAT).to_string(),
    );
    let elapsed_ms = stats.elapsed().num_milliseconds();

    let mut summary = String::from("Email verification summary\n\n");
    let _ = writeln!(
        summary,
        "Started at: {}",
        stats.started_at.format(TIMESTAMP_FORMAT)
    );
    let _ = writeln!(summary, "Finished at: {finished}");
    let _ = writeln!(
        summary,
        "Elapsed: {}.{:03}s",
        elapsed_ms / 1000,
        elapsed_ms % 1000
    );
    let _ = writeln!(summary, "Total emails checked: {}", stats.processed);
    let _ = writeln!(summary, "Total good emails: {}", stats.accepted);
    let _ = writeln!(summary, "Total bad emails: {}", stats.rejected);

    for (reason, count) in &stats.by_reason {
        let _ = writeln!(summary, "Rejected ({reason}): {count}");
    }

    summary
}
