use async_trait::async_trait;
use empath_common::parse_address;

use super::{Check, CheckKind, CheckResult, Reason};
use crate::error::CheckError;

/// Grammar validity of the address. Purely local, no I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxCheck;

#[async_trait]
impl Check for SyntaxCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Syntax
    }

    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError> {
        Ok(match parse_address(candidate) {
            Ok(_) => CheckResult::Pass,
            Err(err) => CheckResult::fail(Reason::Syntax, err.to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_address_passes() {
        let result = SyntaxCheck.evaluate("good@example.com").await.unwrap();
        assert!(result.is_pass());
    }

    #[tokio::test]
    async fn test_discouraged_but_legal_address_passes() {
        let result = SyntaxCheck
            .evaluate(r#""quoted name"@example.com"#)
            .await
            .unwrap();
        assert!(result.is_pass());
    }

    #[tokio::test]
    async fn test_missing_at_fails() {
        let result = SyntaxCheck.evaluate("not-an-email").await.unwrap();
        assert_eq!(
            result,
            CheckResult::fail(Reason::Syntax, "Missing '@' separator")
        );
    }
}
