//! Individual address checks.
//!
//! A [`Check`] is one independent pass/fail predicate over a candidate
//! string. Checks never see each other; ordering and short-circuiting are the
//! job of [`crate::policy::ValidationPolicy`].

use std::fmt::{self, Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CheckError;

mod resolvability;
mod spoof;
mod strictness;
mod syntax;

pub use resolvability::ResolvabilityCheck;
pub use spoof::AntiSpoofCheck;
pub use strictness::StrictnessCheck;
pub use syntax::SyntaxCheck;

/// The kinds of check available to a policy, in production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum CheckKind {
    Syntax,
    Strictness,
    Resolvability,
    AntiSpoof,
}

impl CheckKind {
    /// Every check, cheapest first.
    pub const ALL: [Self; 4] = [
        Self::Syntax,
        Self::Strictness,
        Self::Resolvability,
        Self::AntiSpoof,
    ];
}

impl Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax",
            Self::Strictness => "strictness",
            Self::Resolvability => "resolvability",
            Self::AntiSpoof => "anti-spoof",
        })
    }
}

/// Why a candidate was rejected.
///
/// The [`Display`] form is the stable code written to the rejected output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reason {
    /// The address does not follow the address grammar.
    Syntax,
    /// The address is legal but uses discouraged constructs.
    RfcWarning,
    /// The domain definitely cannot receive mail.
    Dns,
    /// The domain could not be resolved in time; the answer is unknown.
    DnsUnresolved,
    /// The address uses look-alike or invisible characters.
    Spoof,
    /// A check failed unexpectedly.
    InternalError,
}

impl Reason {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::RfcWarning => "rfc_warning",
            Self::Dns => "dns",
            Self::DnsUnresolved => "dns_unresolved",
            Self::Spoof => "spoof",
            Self::InternalError => "internal_error",
        }
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of one check applied to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Pass,
    Fail { reason: Reason, detail: String },
}

impl CheckResult {
    pub fn fail(reason: Reason, detail: impl Into<String>) -> Self {
        Self::Fail {
            reason,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A single, independently substitutable validity predicate.
#[async_trait]
pub trait Check: Debug + Send + Sync {
    /// Which kind of check this is, used to label rejections.
    fn kind(&self) -> CheckKind;

    /// Judge one candidate.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::Transient`] when the answer is unknown because of
    /// an external failure, and [`CheckError::Internal`] when the check itself
    /// misbehaved. Both are turned into rejections by the policy.
    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError>;
}
