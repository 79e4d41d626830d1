//! 스캐너 계열별 규칙
//!
//! 각 함수는 디코딩된 리포트와 해당 계열의 설정을 받아 [`Tally`]로 평가합니다.

use reportgate_formats::report::cyclonedx::CyclonedxReport;
use reportgate_formats::report::grype::SEVERITIES as GRYPE_SEVERITIES;
use reportgate_formats::{
    CyclonedxConfig, GitleaksConfig, GitleaksReport, GrypeConfig, GrypeReport, SemgrepConfig,
    SemgrepReport, UNLIMITED,
};

use crate::engine::{Tally, Verdict};

pub const GRYPE_FIELD: &str = "grype";
pub const SEMGREP_FIELD: &str = "semgrep";
pub const GITLEAKS_FIELD: &str = "gitleaks";
pub const CYCLONEDX_FIELD: &str = "cyclonedx";

/// Gitleaks 집계 수준 이름
pub const SECRETS_LEVEL: &str = "secrets";

/// 취약점 ID로 집계합니다. 알 수 없는 심각도는 `Unknown`으로 셉니다.
pub fn grype(report: &GrypeReport, config: &GrypeConfig) -> Verdict {
    let ceilings = config.ceilings();
    let mut tally = Tally::new(GRYPE_FIELD, &ceilings, &config.allow_list, &config.deny_list);
    for m in &report.matches {
        let severity = m.vulnerability.severity.as_str();
        let level = if GRYPE_SEVERITIES.contains(&severity) {
            severity
        } else {
            "Unknown"
        };
        tally.record(&m.vulnerability.id, level);
    }
    tally.finish()
}

/// 규칙 `check_id`로 집계합니다.
pub fn semgrep(report: &SemgrepReport, config: &SemgrepConfig) -> Verdict {
    let ceilings = config.ceilings();
    let mut tally = Tally::new(SEMGREP_FIELD, &ceilings, &config.allow_list, &config.deny_list);
    for result in report.findings() {
        tally.record(&result.check_id, &result.extra.severity);
    }
    tally.finish()
}

/// 시크릿은 단일 수준입니다. finding이 없으면 설정과 무관하게 통과합니다.
pub fn gitleaks(report: &GitleaksReport, config: &GitleaksConfig) -> Verdict {
    let ceiling = if config.secrets_allowed { UNLIMITED } else { 0 };
    let mut tally = Tally::new(GITLEAKS_FIELD, &[(SECRETS_LEVEL, ceiling)], &[], &[]);
    for finding in report.findings() {
        tally.record(&finding.rule_id, SECRETS_LEVEL);
    }
    tally.finish()
}

/// 첫 등급의 소문자 심각도로 집계합니다.
///
/// 컴포넌트 shim은 적용하지 않습니다. 필요하면 호출자가
/// [`CyclonedxReport::shim_components_as_vulnerabilities`]를 먼저 호출합니다.
pub fn cyclonedx(report: &CyclonedxReport, config: &CyclonedxConfig) -> Verdict {
    let ceilings = config.ceilings();
    let mut tally = Tally::new(CYCLONEDX_FIELD, &ceilings, &config.allow_list, &config.deny_list);
    for vulnerability in report.vulnerabilities() {
        tally.record(&vulnerability.id, &vulnerability.severity());
    }
    tally.finish()
}
