use async_trait::async_trait;
use empath_common::parse_address;

use super::{Check, CheckKind, CheckResult, Reason};
use crate::error::CheckError;

/// Rejects addresses that parse only thanks to obsolete or discouraged
/// constructs: quoted local-parts, comments, surrounding whitespace, address
/// literals, dotless domains and oversized parts.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictnessCheck;

#[async_trait]
impl Check for StrictnessCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Strictness
    }

    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError> {
        let parsed = match parse_address(candidate) {
            Ok(parsed) => parsed,
            Err(err) => return Ok(CheckResult::fail(Reason::Syntax, err.to_string())),
        };

        if parsed.is_strict() {
            return Ok(CheckResult::Pass);
        }

        let warnings = parsed
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        Ok(CheckResult::fail(Reason::RfcWarning, warnings))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn evaluate(candidate: &str) -> CheckResult {
        StrictnessCheck.evaluate(candidate).await.unwrap()
    }

    #[tokio::test]
    async fn test_plain_address_passes() {
        assert!(evaluate("first.last+tag@mail.example.com").await.is_pass());
    }

    #[tokio::test]
    async fn test_quoted_local_part_fails() {
        assert_eq!(
            evaluate(r#""john doe"@example.com"#).await,
            CheckResult::fail(Reason::RfcWarning, "quoted local-part")
        );
    }

    #[tokio::test]
    async fn test_comment_fails() {
        assert_eq!(
            evaluate("john(comment)@example.com").await,
            CheckResult::fail(Reason::RfcWarning, "comment")
        );
    }

    #[tokio::test]
    async fn test_multiple_warnings_are_listed() {
        assert_eq!(
            evaluate(" user@[10.0.0.1]").await,
            CheckResult::fail(
                Reason::RfcWarning,
                "whitespace around address part, address literal domain"
            )
        );
    }

    #[tokio::test]
    async fn test_dotless_domain_fails() {
        assert!(matches!(
            evaluate("root@localhost").await,
            CheckResult::Fail {
                reason: Reason::RfcWarning,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unparseable_address_reports_syntax() {
        assert!(matches!(
            evaluate("nope").await,
            CheckResult::Fail {
                reason: Reason::Syntax,
                ..
            }
        ));
    }
}
