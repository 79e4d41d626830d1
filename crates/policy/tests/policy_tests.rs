//! Policy evaluation, enrichment and bundle validation integration tests

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use reportgate_core::error::ErrorKind;
use reportgate_core::types::ReportKind;
use reportgate_formats::{Bundle, PolicyConfig};
use reportgate_policy::{
    EpssRecord, EpssSource, EpssTable, KevCatalog, PolicyError, ReportOutcome, ReportValidator,
    ValidationOutcome,
};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> Bytes {
    Bytes::from(std::fs::read(fixture_path(name)).unwrap())
}

fn policy(yaml: &str) -> PolicyConfig {
    PolicyConfig::from_yaml(yaml.as_bytes()).unwrap()
}

fn permissive_grype(extra: &str) -> PolicyConfig {
    policy(&format!(
        "version: \"1\"\ngrype:\n  critical: -1\n  high: -1\n  medium: -1\n  low: -1\n  negligible: -1\n  unknown: -1\n{extra}"
    ))
}

async fn validate_report(
    validator: &ReportValidator,
    name: &str,
    config: &PolicyConfig,
) -> Result<ReportOutcome, PolicyError> {
    match validator.validate(fixture(name), config).await? {
        ValidationOutcome::Report(outcome) => Ok(outcome),
        ValidationOutcome::Bundle(_) => panic!("{name} detected as a bundle"),
    }
}

struct FailingFeed;

impl EpssSource for FailingFeed {
    fn lookup(&self, _: &[&str]) -> Result<HashMap<String, EpssRecord>, PolicyError> {
        Err(PolicyError::Feed {
            source_name: "epss".to_owned(),
            reason: "503 Service Unavailable".to_owned(),
        })
    }
}

// --- threshold semantics (3 Critical, 1 High) ---

#[tokio::test]
async fn test_zero_critical_ceiling_fails() {
    let config = policy("version: \"1\"\ngrype:\n  critical: 0\n  high: -1\n");
    let err = validate_report(&ReportValidator::default(), "grype.json", &config)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "grype: Critical (3 found > 0 allowed)");
}

#[tokio::test]
async fn test_unlimited_ceilings_pass() {
    let outcome = validate_report(&ReportValidator::default(), "grype.json", &permissive_grype(""))
        .await
        .unwrap();
    assert_eq!(outcome.kind, ReportKind::VulnScan);
    assert_eq!(outcome.verdict.count("Critical"), Some(3));
    assert_eq!(outcome.verdict.count("High"), Some(1));
}

#[tokio::test]
async fn test_allow_listed_critical_is_not_counted() {
    let config = policy(
        "version: \"1\"\ngrype:\n  critical: 2\n  high: -1\n  allowList:\n    - id: CVE-2023-0286\n      reason: patched upstream\n",
    );
    let outcome = validate_report(&ReportValidator::default(), "grype.json", &config)
        .await
        .unwrap();
    assert_eq!(outcome.verdict.count("Critical"), Some(2));
    assert_eq!(outcome.verdict.allowed.len(), 1);
    assert_eq!(outcome.verdict.allowed[0].reason, "patched upstream");
}

#[tokio::test]
async fn test_all_criticals_allow_listed_pass_zero_ceiling() {
    let config = policy(
        "version: \"1\"\ngrype:\n  critical: 0\n  high: -1\n  allowList:\n    - id: CVE-2023-0286\n    - id: CVE-2022-37434\n    - id: CVE-2021-44228\n",
    );
    assert!(
        validate_report(&ReportValidator::default(), "grype.json", &config)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_deny_listed_id_fails_permissive_ceilings() {
    let config = permissive_grype("  denyList:\n    - id: CVE-2022-42898\n      reason: krb5 exposure\n");
    let err = validate_report(&ReportValidator::default(), "grype.json", &config)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "grype: Denied: CVE-2022-42898 (krb5 exposure)");
}

#[tokio::test]
async fn test_missing_family_section_is_precondition_failure() {
    let err = validate_report(
        &ReportValidator::default(),
        "semgrep.json",
        &permissive_grype(""),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PolicyError::MissingConfig { ref field } if field == "semgrep"));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// --- EPSS ---

#[tokio::test]
async fn test_epss_allow_threshold_removes_before_counting() {
    let table = EpssTable::from_file(&fixture_path("epss.csv")).unwrap();
    let validator = ReportValidator::default().with_epss(Arc::new(table));
    let config = policy(
        "version: \"1\"\ngrype:\n  critical: 2\n  high: -1\n  epssAllowThreshold: 0.002\n",
    );

    let outcome = validate_report(&validator, "grype.json", &config)
        .await
        .unwrap();
    let epss = outcome.epss.unwrap();
    assert_eq!(epss.removed, vec!["CVE-2023-0286"]);
    assert_eq!(outcome.verdict.count("Critical"), Some(2));

    // same config without EPSS exceeds the ceiling
    assert!(
        validate_report(&ReportValidator::default(), "grype.json", &config)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_epss_deny_threshold_fails_despite_ceilings() {
    let table = EpssTable::from_file(&fixture_path("epss.csv")).unwrap();
    let validator = ReportValidator::default().with_epss(Arc::new(table));
    let config = permissive_grype("  epssDenyThreshold: 0.9\n");

    let err = validate_report(&validator, "grype.json", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::EpssDenied { count: 1, .. }));
}

#[tokio::test]
async fn test_epss_unscored_findings_count_as_zero_probability() {
    let table = EpssTable::parse(b"cve,epss,percentile\nCVE-1999-0001,0.5,0.5\n").unwrap();
    let validator = ReportValidator::default().with_epss(Arc::new(table));
    let config = policy("version: \"1\"\ngrype:\n  critical: 0\n  high: 0\n");

    let outcome = validate_report(&validator, "grype.json", &config)
        .await
        .unwrap();
    let epss = outcome.epss.unwrap();
    assert_eq!(epss.unscored.len(), 4);
    assert_eq!(epss.removed.len(), 4);
    assert!(outcome.verdict.passed());
}

#[tokio::test]
async fn test_epss_feed_failure_is_api_kind() {
    let validator = ReportValidator::default().with_epss(Arc::new(FailingFeed));
    let err = validate_report(&validator, "grype.json", &permissive_grype(""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
}

// --- KEV ---

#[tokio::test]
async fn test_kev_json_match_fails() {
    let catalog = KevCatalog::from_file(&fixture_path("kev.json")).unwrap();
    assert_eq!(catalog.catalog_version, "2023.10.16");
    let validator = ReportValidator::default().with_kev(catalog);

    let err = validate_report(&validator, "grype.json", &permissive_grype(""))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "1 Vulnerability matched to KEV Catalog");
}

#[tokio::test]
async fn test_kev_csv_catalog_matches_same_ids() {
    let json = KevCatalog::from_file(&fixture_path("kev.json")).unwrap();
    let csv = KevCatalog::from_file(&fixture_path("kev.csv")).unwrap();
    assert_eq!(csv.catalog_version, "N/A");
    assert_eq!(json.vulnerabilities.len(), csv.vulnerabilities.len());

    let report = match reportgate_formats::FormatDetector::with_defaults()
        .detect(fixture("grype.json"), std::time::Duration::from_secs(5))
        .await
        .unwrap()
    {
        reportgate_formats::Report::VulnScan(report) => report,
        other => panic!("unexpected kind {}", other.kind()),
    };
    assert_eq!(json.matches(&report).matches, csv.matches(&report).matches);
}

#[tokio::test]
async fn test_threshold_and_kev_failures_are_combined() {
    let catalog = KevCatalog::from_file(&fixture_path("kev.json")).unwrap();
    let validator = ReportValidator::default().with_kev(catalog);
    let config = policy("version: \"1\"\ngrype:\n  critical: 0\n  high: -1\n");

    let err = validate_report(&validator, "grype.json", &config)
        .await
        .unwrap_err();
    let PolicyError::Combined(failures) = err else {
        panic!("expected combined failures");
    };
    assert_eq!(failures.len(), 2);
    assert!(matches!(failures[0], PolicyError::Violation { .. }));
    assert!(matches!(failures[1], PolicyError::KevMatched { .. }));
}

// --- bundles ---

fn aggregation_bundle() -> Bundle {
    let mut bundle = Bundle::new();
    bundle.add("grype.json", fixture("grype.json"));
    bundle.add("semgrep.json", fixture("semgrep.json"));
    bundle.add("notes.txt", Bytes::from_static(b"release notes, not a scan"));
    bundle
}

#[tokio::test]
async fn test_bundle_reports_exactly_one_labeled_failure() {
    let config = permissive_grype("semgrep:\n  error: 0\n  warning: -1\n  info: -1\n");
    let err = ReportValidator::default()
        .validate_bundle(&aggregation_bundle(), &config)
        .await
        .unwrap_err();

    let PolicyError::BundleViolations(failures) = err else {
        panic!("expected bundle violations");
    };
    assert_eq!(failures.keys().collect::<Vec<_>>(), vec!["semgrep.json"]);
    assert_eq!(
        failures["semgrep.json"].to_string(),
        "semgrep: ERROR (1 found > 0 allowed)"
    );
}

#[tokio::test]
async fn test_bundle_failure_set_is_deterministic() {
    let config = policy("version: \"1\"\ngrype:\n  critical: 0\nsemgrep:\n  error: 0\n");
    let validator = ReportValidator::default();
    let mut seen = Vec::new();
    for _ in 0..5 {
        let err = validator
            .validate_bundle(&aggregation_bundle(), &config)
            .await
            .unwrap_err();
        seen.push(err.to_string());
    }
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
    assert!(seen[0].starts_with("2 bundle artifact(s) failed validation"));
}

#[tokio::test]
async fn test_bundle_passes_and_lists_skipped() {
    let config = permissive_grype("semgrep:\n  error: -1\n  warning: -1\n  info: -1\n");
    let outcome = ReportValidator::default()
        .validate_bundle(&aggregation_bundle(), &config)
        .await
        .unwrap();
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.skipped, vec!["notes.txt"]);
}

#[tokio::test]
async fn test_encoded_bundle_is_detected_and_validated() {
    let config = policy("version: \"1\"\ngrype:\n  critical: 0\nsemgrep:\n  error: -1\n  warning: -1\n  info: -1\n");
    let encoded = aggregation_bundle().to_bytes().unwrap();
    let err = ReportValidator::default()
        .validate(encoded, &config)
        .await
        .unwrap_err();
    let PolicyError::BundleViolations(failures) = err else {
        panic!("expected bundle violations");
    };
    assert_eq!(failures.keys().collect::<Vec<_>>(), vec!["grype.json"]);
}

#[tokio::test]
async fn test_fixture_policy_flags_each_failing_label() {
    let config = PolicyConfig::from_yaml(&fixture("policy.yaml")).unwrap();
    let mut bundle = Bundle::new();
    for name in ["grype.json", "semgrep.json", "gitleaks.json", "cyclonedx.json"] {
        bundle.add_file(&fixture_path(name)).unwrap();
    }

    let err = ReportValidator::default()
        .validate_bundle(&bundle, &config)
        .await
        .unwrap_err();
    let PolicyError::BundleViolations(failures) = err else {
        panic!("expected bundle violations");
    };
    assert_eq!(
        failures.keys().collect::<Vec<_>>(),
        vec!["gitleaks.json", "grype.json", "semgrep.json"]
    );
}

#[tokio::test]
async fn test_required_kinds_missing_from_bundle() {
    let config = policy(
        "version: \"1\"\ngrype:\n  required: true\n  critical: -1\n  high: -1\ngitleaks:\n  required: true\n  secretsAllowed: true\n",
    );
    let mut bundle = Bundle::new();
    bundle.add("grype.json", fixture("grype.json"));

    let err = ReportValidator::default()
        .validate_bundle(&bundle, &config)
        .await
        .unwrap_err();
    let PolicyError::BundleViolations(failures) = err else {
        panic!("expected bundle violations");
    };
    assert_eq!(failures.keys().collect::<Vec<_>>(), vec!["required:gitleaks"]);
}

#[tokio::test]
async fn test_feed_error_aborts_bundle_validation() {
    let validator = ReportValidator::default().with_epss(Arc::new(FailingFeed));
    let err = validator
        .validate_bundle(&aggregation_bundle(), &permissive_grype(""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
}
