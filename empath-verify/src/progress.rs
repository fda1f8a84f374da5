//! Progress reporting for verification runs.
//!
//! Progress is purely observational: implementations must not influence
//! which candidates are accepted.

use tracing::info;

pub trait Progress: Send {
    /// A run over `total` candidates is about to begin.
    fn start(&mut self, total: usize);

    /// `n` more candidates have been decided.
    fn advance(&mut self, n: usize);

    /// The run has finished (successfully or not).
    fn finish(&mut self);
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _total: usize) {}

    fn advance(&mut self, _n: usize) {}

    fn finish(&mut self) {}
}

/// Logs an `info` event every time another 10% of the run completes.
#[derive(Debug, Default, Clone)]
pub struct LogProgress {
    total: usize,
    done: usize,
    last_decile: usize,
}

impl LogProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn done(&self) -> usize {
        self.done
    }

    const fn decile(&self) -> usize {
        if self.total == 0 {
            10
        } else {
            self.done.saturating_mul(10) / self.total
        }
    }
}

impl Progress for LogProgress {
    fn start(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
        self.last_decile = 0;
        info!(total, "Verifying addresses");
    }

    fn advance(&mut self, n: usize) {
        self.done = self.done.saturating_add(n).min(self.total);

        let decile = self.decile();
        if decile > self.last_decile {
            self.last_decile = decile;
            info!(
                done = self.done,
                total = self.total,
                "{}% of addresses verified",
                decile * 10
            );
        }
    }

    fn finish(&mut self) {
        info!(done = self.done, total = self.total, "Verification finished");
    }
}
