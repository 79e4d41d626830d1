//! Integration tests for the `reportgate` command handlers.
//!
//! Handlers are driven with parsed `Cli` values against the fixtures in
//! `tests/fixtures/`; output goes to stdout in JSON form.

use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;

use reportgate_cli::cli::{Cli, OutputFormat};
use reportgate_cli::commands;
use reportgate_cli::error::CliError;
use reportgate_cli::output::OutputWriter;
use reportgate_core::config::GateConfig;
use reportgate_core::error::ErrorKind;
use reportgate_formats::Bundle;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> String {
    fixture_path(name).display().to_string()
}

async fn run(args: &[&str]) -> Result<(), CliError> {
    let mut argv = vec!["reportgate"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("arguments should parse");
    let writer = OutputWriter::new(OutputFormat::Json);
    commands::run(cli.command, &cli.config, &GateConfig::default(), &writer).await
}

fn permissive_policy(dir: &TempDir) -> String {
    let path = dir.path().join("permissive.yaml");
    std::fs::write(
        &path,
        "version: \"1\"\ngrype:\n  critical: -1\n  high: -1\n  medium: -1\n  low: -1\n  negligible: -1\n  unknown: -1\n",
    )
    .expect("write policy");
    path.display().to_string()
}

#[tokio::test]
async fn test_validate_failing_report_exits_with_validation_code() {
    let err = run(&[
        "validate",
        &fixture("grype.json"),
        "--policy",
        &fixture("policy.yaml"),
    ])
    .await
    .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Validation));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_validate_audit_mode_succeeds() {
    let result = run(&[
        "validate",
        &fixture("grype.json"),
        "--policy",
        &fixture("policy.yaml"),
        "--audit",
    ])
    .await;

    assert!(result.is_ok(), "audit mode should not fail the command");
}

#[tokio::test]
async fn test_validate_permissive_policy_passes() {
    let dir = TempDir::new().expect("temp dir");
    let policy = permissive_policy(&dir);

    run(&["validate", &fixture("grype.json"), "--policy", &policy])
        .await
        .expect("unlimited ceilings should pass");
}

#[tokio::test]
async fn test_validate_kev_match_fails_permissive_policy() {
    let dir = TempDir::new().expect("temp dir");
    let policy = permissive_policy(&dir);

    let err = run(&[
        "validate",
        &fixture("grype.json"),
        "--policy",
        &policy,
        "--kev-file",
        &fixture("kev.json"),
    ])
    .await
    .unwrap_err();

    assert_eq!(err.exit_code(), 1, "KEV match is a validation failure");
    assert!(err.to_string().contains("KEV Catalog"));
}

#[tokio::test]
async fn test_validate_missing_target_is_file_access() {
    let err = run(&[
        "validate",
        "/nonexistent/reportgate/grype.json",
        "--policy",
        &fixture("policy.yaml"),
    ])
    .await
    .unwrap_err();

    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_validate_malformed_policy_is_encoding_error() {
    let dir = TempDir::new().expect("temp dir");
    let policy = dir.path().join("bad.yaml");
    std::fs::write(&policy, "version: \"1\"\ngrype:\n  critical: -5\n").expect("write policy");

    let err = run(&[
        "validate",
        &fixture("grype.json"),
        "--policy",
        &policy.display().to_string(),
    ])
    .await
    .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Encoding));
    assert_eq!(err.exit_code(), -1);
}

#[tokio::test]
async fn test_bundle_lifecycle() {
    let dir = TempDir::new().expect("temp dir");
    let bundle_path = dir.path().join("scans.gz");
    let bundle_arg = bundle_path.display().to_string();

    run(&[
        "bundle",
        "create",
        &fixture("grype.json"),
        &fixture("semgrep.json"),
        "-o",
        &bundle_arg,
    ])
    .await
    .expect("create should succeed");

    run(&["bundle", "add", &bundle_arg, &fixture("gitleaks.json")])
        .await
        .expect("add should succeed");

    let bundle = Bundle::read_file(&bundle_path, 1 << 20).expect("bundle readable");
    assert_eq!(
        bundle.labels().collect::<Vec<_>>(),
        vec!["gitleaks.json", "grype.json", "semgrep.json"]
    );

    run(&["bundle", "list", &bundle_arg, "--policy", &fixture("policy.yaml")])
        .await
        .expect("list should succeed");

    let extracted = dir.path().join("grype-out.json");
    run(&[
        "bundle",
        "extract",
        &bundle_arg,
        "grype.json",
        "-o",
        &extracted.display().to_string(),
    ])
    .await
    .expect("extract should succeed");
    assert_eq!(
        std::fs::read(&extracted).expect("extracted file"),
        std::fs::read(fixture_path("grype.json")).expect("fixture"),
        "extracted payload should be byte-identical"
    );

    run(&["bundle", "remove", &bundle_arg, "gitleaks.json"])
        .await
        .expect("remove should succeed");
    let err = run(&["bundle", "remove", &bundle_arg, "gitleaks.json"])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::UserInput));
}

#[tokio::test]
async fn test_bundle_validate_reports_failing_labels() {
    let dir = TempDir::new().expect("temp dir");
    let bundle_path = dir.path().join("scans.gz");
    let bundle_arg = bundle_path.display().to_string();

    run(&[
        "bundle",
        "create",
        &fixture("grype.json"),
        &fixture("gitleaks.json"),
        "/nonexistent/reportgate/missing.json",
        "--allow-missing",
        "-o",
        &bundle_arg,
    ])
    .await
    .expect("missing inputs are skipped");

    let err = run(&["validate", &bundle_arg, "--policy", &fixture("policy.yaml")])
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 1);
    let message = err.to_string();
    assert!(message.contains("gitleaks.json"));
    assert!(message.contains("grype.json"));
}

#[tokio::test]
async fn test_epss_listing() {
    run(&[
        "epss",
        &fixture("grype.json"),
        "--epss-file",
        &fixture("epss.csv"),
    ])
    .await
    .expect("epss listing should succeed");
}

#[tokio::test]
async fn test_epss_requires_score_file() {
    let err = run(&["epss", &fixture("grype.json")]).await.unwrap_err();
    assert!(matches!(err, CliError::Command(_)));
}

#[tokio::test]
async fn test_epss_rejects_non_vulnerability_report() {
    let err = run(&[
        "epss",
        &fixture("semgrep.json"),
        "--epss-file",
        &fixture("epss.csv"),
    ])
    .await
    .unwrap_err();
    assert!(err.to_string().contains("expected a vulnerability scan"));
}

#[tokio::test]
async fn test_print_mixed_inputs() {
    let dir = TempDir::new().expect("temp dir");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "release notes, not a scan").expect("write notes");

    run(&[
        "print",
        &fixture("grype.json"),
        &fixture("semgrep.json"),
        &notes.display().to_string(),
    ])
    .await
    .expect("print should classify every input");
}
