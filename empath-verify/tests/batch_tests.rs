//! End-to-end verification runs against files on disk

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::{sync::Arc, sync::atomic::Ordering, time::Duration};

use empath_verify::{
    CheckKind, NoProgress, Reason, RunError, SourceError, ValidationPolicy,
    check::{ResolvabilityCheck, SyntaxCheck},
    dns::{MockAnswer, MockDnsResolver},
    verify_file, verify_file_with,
};
use pretty_assertions::assert_eq;
use support::{PanicOn, StubResolvability, config_in, read, write_input};

fn stub_policy() -> ValidationPolicy {
    ValidationPolicy::new()
        .with_check(SyntaxCheck)
        .with_check(StubResolvability::new())
}

#[tokio::test]
async fn test_three_address_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        &[
            "good@example.com",
            "not-an-email",
            "user@nonexistent-domain-xyz123.test",
        ],
    );
    let config = config_in(dir.path());

    let stats = verify_file_with(&config, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(stats.processed, 3);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.rejected, 2);
    assert!(stats.is_consistent());

    let out = &config.output_dir;
    assert_eq!(read(out.join("goodEmails.csv")), "good@example.com\n");
    assert_eq!(
        read(out.join("badEmails.csv")),
        "not-an-email,syntax\nuser@nonexistent-domain-xyz123.test,dns\n"
    );

    let summary = read(out.join("summary.txt"));
    assert!(summary.contains("Total emails checked: 3\n"));
    assert!(summary.contains("Total good emails: 1\n"));
    assert!(summary.contains("Total bad emails: 2\n"));
    assert!(summary.contains("Rejected (syntax): 1\n"));
    assert!(summary.contains("Rejected (dns): 1\n"));
}

#[tokio::test]
async fn test_syntax_failures_never_reach_resolvability() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &["broken", "a@b.io", "also broken", "@b.io"]);

    let stub = StubResolvability::new();
    let calls = stub.counter();
    let policy = ValidationPolicy::new().with_check(SyntaxCheck).with_check(stub);

    let stats = verify_file_with(&config_in(dir.path()), &input, policy, &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(stats.rejected_for(Reason::Syntax), 3);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        &["a@b.io", "bad", "c@d.test", "\"odd, name\"@b.io", "e@f.io"],
    );

    let mut first = config_in(dir.path());
    first.output_dir = dir.path().join("first");
    let mut second = config_in(dir.path());
    second.output_dir = dir.path().join("second");

    verify_file_with(&first, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap();
    verify_file_with(&second, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap();

    for file in ["goodEmails.csv", "badEmails.csv"] {
        assert_eq!(
            std::fs::read(first.output_dir.join(file)).unwrap(),
            std::fs::read(second.output_dir.join(file)).unwrap(),
            "{file} differs between runs"
        );
    }
}

#[tokio::test]
async fn test_every_candidate_lands_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let lines = [
        "one@a.io", "two", "three@b.test", "four@c.io", "five@", "six@d.io",
    ];
    let input = write_input(dir.path(), &lines);
    let mut config = config_in(dir.path());
    config.record_reasons = false;

    verify_file_with(&config, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap();

    let good = read(config.output_dir.join("goodEmails.csv"));
    let bad = read(config.output_dir.join("badEmails.csv"));
    let good: Vec<_> = good.lines().collect();
    let bad: Vec<_> = bad.lines().collect();

    assert_eq!(good, vec!["one@a.io", "four@c.io", "six@d.io"]);
    assert_eq!(bad, vec!["two", "three@b.test", "five@"]);
}

#[tokio::test]
async fn test_empty_input_produces_zero_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.txt");
    std::fs::write(&input, "").unwrap();
    let config = config_in(dir.path());

    let stats = verify_file_with(&config, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap();

    assert_eq!((stats.processed, stats.accepted, stats.rejected), (0, 0, 0));
    assert_eq!(read(config.output_dir.join("goodEmails.csv")), "");
    assert_eq!(read(config.output_dir.join("badEmails.csv")), "");
    assert!(read(config.output_dir.join("summary.txt")).contains("Total emails checked: 0\n"));
}

#[tokio::test]
async fn test_transient_failure_is_dns_unresolved() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &["a@slow.io", "b@fast.io"]);
    let config = config_in(dir.path());

    let stats = verify_file_with(&config, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.rejected_for(Reason::DnsUnresolved), 1);
    assert_eq!(
        read(config.output_dir.join("badEmails.csv")),
        "a@slow.io,dns_unresolved\n"
    );
}

#[tokio::test]
async fn test_hanging_resolver_is_cut_off() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &["a@hang.io", "b@mail.io"]);
    let config = config_in(dir.path());

    let resolver = Arc::new(
        MockDnsResolver::new()
            .with_answer("hang.io", MockAnswer::Hang)
            .with_mx("mail.io", "mx.mail.io"),
    );
    let policy = ValidationPolicy::new()
        .with_check(SyntaxCheck)
        .with_check(ResolvabilityCheck::new(resolver, Duration::from_millis(50)));

    let stats = verify_file_with(&config, &input, policy, &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.rejected_for(Reason::DnsUnresolved), 1);
}

#[tokio::test]
async fn test_panicking_check_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &["a@b.io", "boom@b.io", "c@d.io"]);
    let config = config_in(dir.path());

    let policy = ValidationPolicy::new()
        .with_check(SyntaxCheck)
        .with_check(PanicOn("boom@b.io"));

    let stats = verify_file_with(&config, &input, policy, &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(stats.processed, 3);
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.rejected_for(Reason::InternalError), 1);
    assert_eq!(
        read(config.output_dir.join("badEmails.csv")),
        "boom@b.io,internal_error\n"
    );
}

#[tokio::test]
async fn test_missing_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let err = verify_file_with(
        &config,
        &dir.path().join("missing.txt"),
        stub_policy(),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::Source(SourceError::Input { .. })));
    assert!(!config.output_dir.exists());
}

#[tokio::test]
async fn test_binary_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("image.png");
    std::fs::write(&input, [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00]).unwrap();
    let config = config_in(dir.path());

    let err = verify_file_with(&config, &input, stub_policy(), &mut NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Source(SourceError::Format { .. })));
    assert!(!config.output_dir.exists());
}

#[tokio::test]
async fn test_production_checks_with_scripted_dns() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        &[
            "alice@mail.io",
            "\"alice\"@mail.io",
            "alice@gone.io",
            "p\u{430}ypal@mail.io",
            "alice",
        ],
    );
    let config = config_in(dir.path());
    assert_eq!(config.checks, CheckKind::ALL.to_vec());

    let resolver = Arc::new(MockDnsResolver::new().with_mx("mail.io", "mx.mail.io"));
    let stats = verify_file(&config, &input, resolver, &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(stats.accepted, 1);
    assert_eq!(read(config.output_dir.join("goodEmails.csv")), "alice@mail.io\n");
    assert_eq!(
        read(config.output_dir.join("badEmails.csv")),
        "\"\"\"alice\"\"@mail.io\",rfc_warning\n\
         alice@gone.io,dns\n\
         p\u{430}ypal@mail.io,spoof\n\
         alice,syntax\n"
    );
}
