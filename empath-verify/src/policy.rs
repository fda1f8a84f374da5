//! Check orchestration
//!
//! A [`ValidationPolicy`] is an ordered list of [`Check`]s applied to each
//! candidate. Evaluation stops at the first check that does not pass, so a
//! candidate that fails syntax never costs a DNS lookup.
//!
//! Errors and panics raised by a check never escape the policy: they are
//! folded into a rejection with [`Reason::DnsUnresolved`] (for transient
//! failures) or [`Reason::InternalError`].

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::{
    check::{
        AntiSpoofCheck, Check, CheckKind, CheckResult, Reason, ResolvabilityCheck,
        StrictnessCheck, SyntaxCheck,
    },
    dns::DnsResolver,
    error::CheckError,
};

/// Why a candidate was rejected, and by which check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: Reason,
    /// The check that produced the rejection
    pub check: CheckKind,
    pub detail: String,
}

/// Final verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Accepted,
    Rejected(Rejection),
}

impl VerificationOutcome {
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The rejection reason, if any
    #[must_use]
    pub const fn reason(&self) -> Option<Reason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(rejection) => Some(rejection.reason),
        }
    }
}

/// Ordered, short-circuiting sequence of checks.
///
/// A policy with no checks accepts every candidate.
#[derive(Debug, Default)]
pub struct ValidationPolicy {
    checks: Vec<Box<dyn Check>>,
}

impl ValidationPolicy {
    /// An empty policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check; it runs after every check already added.
    #[must_use]
    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// The full production policy: syntax, strictness, resolvability, anti-spoof.
    #[must_use]
    pub fn production(resolver: Arc<dyn DnsResolver>, timeout: Duration) -> Self {
        Self::from_kinds(&CheckKind::ALL, resolver, timeout)
    }

    /// Build a policy running `kinds` in the given order.
    #[must_use]
    pub fn from_kinds(
        kinds: &[CheckKind],
        resolver: Arc<dyn DnsResolver>,
        timeout: Duration,
    ) -> Self {
        kinds.iter().fold(Self::new(), |policy, kind| match kind {
            CheckKind::Syntax => policy.with_check(SyntaxCheck),
            CheckKind::Strictness => policy.with_check(StrictnessCheck),
            CheckKind::Resolvability => {
                policy.with_check(ResolvabilityCheck::new(Arc::clone(&resolver), timeout))
            }
            CheckKind::AntiSpoof => policy.with_check(AntiSpoofCheck),
        })
    }

    /// Kinds of the configured checks, in evaluation order
    pub fn kinds(&self) -> impl Iterator<Item = CheckKind> + '_ {
        self.checks.iter().map(|check| check.kind())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run the checks over `candidate` until one of them fails.
    pub async fn evaluate(&self, candidate: &str) -> VerificationOutcome {
        for check in &self.checks {
            let kind = check.kind();
            let result = AssertUnwindSafe(check.evaluate(candidate))
                .catch_unwind()
                .await;

            let rejection = match result {
                Ok(Ok(CheckResult::Pass)) => continue,
                Ok(Ok(CheckResult::Fail { reason, detail })) => Rejection {
                    reason,
                    check: kind,
                    detail,
                },
                Ok(Err(CheckError::Transient(detail))) => Rejection {
                    reason: Reason::DnsUnresolved,
                    check: kind,
                    detail,
                },
                Ok(Err(CheckError::Internal(detail))) => {
                    warn!("{kind} check failed on {candidate:?}: {detail}");
                    Rejection {
                        reason: Reason::InternalError,
                        check: kind,
                        detail,
                    }
                }
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    warn!("{kind} check panicked on {candidate:?}: {detail}");
                    Rejection {
                        reason: Reason::InternalError,
                        check: kind,
                        detail,
                    }
                }
            };

            debug!(
                candidate,
                check = %kind,
                reason = %rejection.reason,
                "Candidate rejected"
            );
            return VerificationOutcome::Rejected(rejection);
        }

        VerificationOutcome::Accepted
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("check panicked"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dns::MockDnsResolver;

    #[derive(Debug)]
    struct Failing(CheckError);

    #[async_trait]
    impl Check for Failing {
        fn kind(&self) -> CheckKind {
            CheckKind::Resolvability
        }

        async fn evaluate(&self, _candidate: &str) -> Result<CheckResult, CheckError> {
            Err(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait]
    impl Check for Panicking {
        fn kind(&self) -> CheckKind {
            CheckKind::AntiSpoof
        }

        async fn evaluate(&self, _candidate: &str) -> Result<CheckResult, CheckError> {
            panic!("boom")
        }
    }

    #[tokio::test]
    async fn test_empty_policy_accepts_everything() {
        let policy = ValidationPolicy::new();
        assert!(policy.evaluate("not even close").await.is_accepted());
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let policy = ValidationPolicy::new()
            .with_check(SyntaxCheck)
            .with_check(StrictnessCheck);

        let outcome = policy.evaluate("missing-at").await;
        assert_eq!(outcome.reason(), Some(Reason::Syntax));
        let VerificationOutcome::Rejected(rejection) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.check, CheckKind::Syntax);
    }

    #[tokio::test]
    async fn test_transient_error_becomes_dns_unresolved() {
        let policy = ValidationPolicy::new()
            .with_check(Failing(CheckError::Transient(String::from("timed out"))));

        let outcome = policy.evaluate("user@slow.io").await;
        assert_eq!(outcome.reason(), Some(Reason::DnsUnresolved));
    }

    #[tokio::test]
    async fn test_internal_error_becomes_internal_error() {
        let policy = ValidationPolicy::new()
            .with_check(Failing(CheckError::Internal(String::from("bad state"))));

        let outcome = policy.evaluate("user@example.io").await;
        assert_eq!(outcome.reason(), Some(Reason::InternalError));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let policy = ValidationPolicy::new().with_check(Panicking);

        let outcome = policy.evaluate("user@example.io").await;
        assert_eq!(
            outcome,
            VerificationOutcome::Rejected(Rejection {
                reason: Reason::InternalError,
                check: CheckKind::AntiSpoof,
                detail: String::from("boom"),
            })
        );
    }

    #[test]
    fn test_from_kinds_keeps_order() {
        let resolver = Arc::new(MockDnsResolver::new());
        let policy = ValidationPolicy::from_kinds(
            &[CheckKind::AntiSpoof, CheckKind::Syntax],
            resolver,
            Duration::from_secs(1),
        );

        assert_eq!(
            policy.kinds().collect::<Vec<_>>(),
            vec![CheckKind::AntiSpoof, CheckKind::Syntax]
        );
    }

    #[test]
    fn test_production_policy_has_all_checks() {
        let policy = ValidationPolicy::production(
            Arc::new(MockDnsResolver::new()),
            Duration::from_secs(1),
        );
        assert_eq!(policy.kinds().collect::<Vec<_>>(), CheckKind::ALL.to_vec());
    }
}
