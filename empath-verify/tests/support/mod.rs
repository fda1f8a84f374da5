//! Deterministic stand-in checks for integration tests.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use empath_verify::{Check, CheckError, CheckKind, CheckResult, Reason, VerifyConfig};

/// Resolvability stand-in with no network access.
///
/// - domains ending in `.test` do not exist
/// - domains starting with `slow.` time out
/// - everything else resolves
#[derive(Debug, Default, Clone)]
pub struct StubResolvability {
    calls: Arc<AtomicUsize>,
}

impl StubResolvability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared call counter, still readable after the check moves into a policy.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Check for StubResolvability {
    fn kind(&self) -> CheckKind {
        CheckKind::Resolvability
    }

    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let domain = candidate.rsplit_once('@').map_or("", |(_, domain)| domain);
        if domain.starts_with("slow.") {
            return Err(CheckError::Transient(format!("lookup for {domain} timed out")));
        }
        if domain.ends_with(".test") {
            return Ok(CheckResult::fail(
                Reason::Dns,
                format!("{domain} does not exist"),
            ));
        }

        Ok(CheckResult::Pass)
    }
}

/// Panics on one specific candidate and passes everything else.
#[derive(Debug)]
pub struct PanicOn(pub &'static str);

#[async_trait]
impl Check for PanicOn {
    fn kind(&self) -> CheckKind {
        CheckKind::AntiSpoof
    }

    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError> {
        assert!(candidate != self.0, "refusing to look at {candidate}");
        Ok(CheckResult::Pass)
    }
}

/// Write `lines` to `input.txt` in `dir`, one per line.
pub fn write_input(dir: &Path, lines: &[&str]) -> PathBuf {
    let path = dir.join("input.txt");
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(&path, content).expect("write input file");
    path
}

/// Default configuration writing into `dir/out`.
pub fn config_in(dir: &Path) -> VerifyConfig {
    VerifyConfig {
        output_dir: dir.join("out"),
        ..VerifyConfig::default()
    }
}

pub fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path).expect("read output file")
}
