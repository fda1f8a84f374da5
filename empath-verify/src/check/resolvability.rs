use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use empath_common::parse_address;
use tracing::warn;

use super::{Check, CheckKind, CheckResult, Reason};
use crate::{
    dns::{DnsError, DnsResolver},
    error::CheckError,
};

/// Confirms the candidate's domain can receive mail: MX records, or A/AAAA
/// records when no MX exists.
///
/// Every lookup is bounded by `timeout`, so an unresponsive domain costs at
/// most that long. Timeouts and resolver failures are reported as
/// [`CheckError::Transient`] rather than as a verdict on the domain.
#[derive(Debug, Clone)]
pub struct ResolvabilityCheck {
    resolver: Arc<dyn DnsResolver>,
    timeout: Duration,
}

impl ResolvabilityCheck {
    pub fn new(resolver: Arc<dyn DnsResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }
}

#[async_trait]
impl Check for ResolvabilityCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Resolvability
    }

    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError> {
        let domain = match parse_address(candidate) {
            Ok(parsed) => parsed.mailbox.domain,
            Err(err) => return Ok(CheckResult::fail(Reason::Syntax, err.to_string())),
        };

        if domain.is_address_literal() {
            return Ok(CheckResult::Pass);
        }

        if domain.is_reserved() {
            return Ok(CheckResult::fail(
                Reason::Dns,
                format!("{domain} is a reserved name and cannot receive mail"),
            ));
        }

        let lookup = self.resolver.resolve_mail_servers(&domain);
        let answer = tokio::time::timeout(self.timeout, lookup)
            .await
            .unwrap_or_else(|_| Err(DnsError::Timeout(domain.to_string())));

        match answer {
            Ok(servers) if !servers.is_empty() => Ok(CheckResult::Pass),
            Ok(_) => Ok(CheckResult::fail(
                Reason::Dns,
                DnsError::NoMailServers(domain.to_string()).to_string(),
            )),
            Err(err) if err.is_temporary() => {
                warn!("Could not resolve {domain}: {err}");
                Err(CheckError::Transient(err.to_string()))
            }
            Err(err) => Ok(CheckResult::fail(Reason::Dns, err.to_string())),
        }
    }
}
