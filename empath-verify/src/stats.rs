use std::collections::BTreeMap;

use chrono::{DateTime, Local, TimeDelta};

use crate::{check::Reason, policy::VerificationOutcome};

/// Counters for a single verification run.
///
/// `processed == accepted + rejected` holds after every call to
/// [`RunStatistics::record`], and the per-reason counts add up to `rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub processed: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub by_reason: BTreeMap<Reason, u64>,
}

impl RunStatistics {
    /// Begin counting now.
    #[must_use]
    pub fn start() -> Self {
        Self::started_at(Local::now())
    }

    #[must_use]
    pub const fn started_at(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            finished_at: None,
            processed: 0,
            accepted: 0,
            rejected: 0,
            by_reason: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, outcome: &VerificationOutcome) {
        self.processed += 1;
        match outcome.reason() {
            None => self.accepted += 1,
            Some(reason) => {
                self.rejected += 1;
                *self.by_reason.entry(reason).or_default() += 1;
            }
        }
    }

    pub fn finish(&mut self) {
        self.finish_at(Local::now());
    }

    pub fn finish_at(&mut self, finished_at: DateTime<Local>) {
        self.finished_at = Some(finished_at);
    }

    /// Wall-clock duration of the run, or the time so far if it is still going.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        self.finished_at.unwrap_or_else(Local::now) - self.started_at
    }

    /// Number of rejections attributed to `reason`
    #[must_use]
    pub fn rejected_for(&self, reason: Reason) -> u64 {
        self.by_reason.get(&reason).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.processed == self.accepted + self.rejected
            && self.by_reason.values().sum::<u64>() == self.rejected
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{check::CheckKind, policy::Rejection};

    fn rejected(reason: Reason) -> VerificationOutcome {
        VerificationOutcome::Rejected(Rejection {
            reason,
            check: CheckKind::Syntax,
            detail: String::new(),
        })
    }

    #[test]
    fn test_counts_stay_consistent() {
        let mut stats = RunStatistics::start();
        assert!(stats.is_consistent());

        stats.record(&VerificationOutcome::Accepted);
        stats.record(&rejected(Reason::Syntax));
        stats.record(&rejected(Reason::Syntax));
        stats.record(&rejected(Reason::DnsUnresolved));

        assert_eq!(stats.processed, 4);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.rejected_for(Reason::Syntax), 2);
        assert_eq!(stats.rejected_for(Reason::DnsUnresolved), 1);
        assert_eq!(stats.rejected_for(Reason::Spoof), 0);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_elapsed_uses_finish_time() {
        let start = Local::now();
        let mut stats = RunStatistics::started_at(start);
        stats.finish_at(start + TimeDelta::seconds(90));

        assert_eq!(stats.elapsed(), TimeDelta::seconds(90));
    }
}
