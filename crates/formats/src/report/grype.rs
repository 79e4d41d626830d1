//! Grype 취약점 스캔 리포트
//!
//! Anchore Grype의 JSON 출력 중 정책 평가와 리포팅에 필요한 부분만 모델링합니다.
//! 구조 검사는 `descriptor.name == "grype"` 입니다.

use serde::{Deserialize, Serialize};

use reportgate_core::types::ReportKind;

use super::{ListItem, Report, ReportFormat, check_ceilings, parse_json};
use crate::error::FormatError;

const FORMAT: &str = "grype";

/// 스캐너 이름으로 기대하는 값
pub const SCANNER_NAME: &str = "grype";

/// Grype 심각도 순서
pub const SEVERITIES: [&str; 6] = ["Critical", "High", "Medium", "Low", "Negligible", "Unknown"];

/// Grype 스캔 리포트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrypeReport {
    /// 매칭된 취약점 목록
    #[serde(default)]
    pub matches: Vec<GrypeMatch>,
    /// 스캔 대상 정보 (통과만 함)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    /// 스캐너 정보
    pub descriptor: GrypeDescriptor,
}

impl GrypeReport {
    /// 조건을 만족하는 매치를 제거하고 제거된 매치를 반환합니다.
    pub fn remove_matches<F>(&mut self, mut predicate: F) -> Vec<GrypeMatch>
    where
        F: FnMut(&GrypeMatch) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.matches.drain(..).partition(|m| predicate(m));
        self.matches = kept;
        removed
    }

    /// 매치된 취약점 ID 목록
    pub fn vulnerability_ids(&self) -> Vec<&str> {
        self.matches
            .iter()
            .map(|m| m.vulnerability.id.as_str())
            .collect()
    }
}

/// 스캐너 설명자
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// 취약점 매치
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrypeMatch {
    pub vulnerability: GrypeVulnerability,
    pub artifact: GrypeArtifact,
}

/// 매치된 취약점
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrypeVulnerability {
    pub id: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 취약점이 발견된 패키지
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrypeArtifact {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default)]
    pub package_type: String,
}

/// Grype 정책 설정 (`grype:` 섹션)
///
/// 생략된 임계값은 0(허용 안 함)입니다. EPSS 거부 임계값의 기본값은 1.0으로,
/// 명시하지 않으면 확률 1.0인 취약점만 거부합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrypeConfig {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub critical: i64,
    #[serde(default)]
    pub high: i64,
    #[serde(default)]
    pub medium: i64,
    #[serde(default)]
    pub low: i64,
    #[serde(default)]
    pub negligible: i64,
    #[serde(default)]
    pub unknown: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_list: Vec<ListItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_list: Vec<ListItem>,
    /// 이 확률 이하인 취약점은 리포트에서 제거됩니다.
    #[serde(default)]
    pub epss_allow_threshold: f64,
    /// 이 확률 이상인 취약점은 거부됩니다.
    #[serde(default = "default_epss_deny_threshold")]
    pub epss_deny_threshold: f64,
}

/// EPSS 거부 임계값 기본값
pub const DEFAULT_EPSS_DENY_THRESHOLD: f64 = 1.0;

fn default_epss_deny_threshold() -> f64 {
    DEFAULT_EPSS_DENY_THRESHOLD
}

impl GrypeConfig {
    /// 심각도별 임계값 (표시 순서)
    pub fn ceilings(&self) -> [(&'static str, i64); 6] {
        [
            ("Critical", self.critical),
            ("High", self.high),
            ("Medium", self.medium),
            ("Low", self.low),
            ("Negligible", self.negligible),
            ("Unknown", self.unknown),
        ]
    }

    pub(crate) fn validate(&self) -> Result<(), FormatError> {
        check_ceilings("grype config", &self.ceilings())?;
        for (field, value) in [
            ("epssAllowThreshold", self.epss_allow_threshold),
            ("epssDenyThreshold", self.epss_deny_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FormatError::check(
                    "grype config",
                    format!("{field} must be within [0, 1], got {value}"),
                ));
            }
        }
        Ok(())
    }
}

impl Default for GrypeConfig {
    fn default() -> Self {
        Self {
            required: false,
            critical: -1,
            high: -1,
            medium: -1,
            low: -1,
            negligible: -1,
            unknown: -1,
            allow_list: Vec::new(),
            deny_list: Vec::new(),
            epss_allow_threshold: 0.0,
            epss_deny_threshold: DEFAULT_EPSS_DENY_THRESHOLD,
        }
    }
}

/// Grype 리포트 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct GrypeFormat;

impl ReportFormat for GrypeFormat {
    type Output = GrypeReport;

    fn kind(&self) -> ReportKind {
        ReportKind::VulnScan
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, raw: &[u8]) -> Result<GrypeReport, FormatError> {
        parse_json(FORMAT, raw)
    }

    fn check(&self, report: &GrypeReport) -> Result<(), FormatError> {
        if report.descriptor.name != SCANNER_NAME {
            return Err(FormatError::check(
                FORMAT,
                format!(
                    "descriptor name must be '{SCANNER_NAME}', got '{}'",
                    report.descriptor.name
                ),
            ));
        }
        Ok(())
    }

    fn into_report(parsed: GrypeReport) -> Report {
        Report::VulnScan(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportDecoder;

    const MINIMAL: &str = r#"{
        "matches": [
            {
                "vulnerability": {"id": "CVE-2023-0001", "severity": "Critical", "dataSource": "https://nvd.nist.gov/vuln/detail/CVE-2023-0001"},
                "artifact": {"name": "openssl", "version": "1.1.1", "type": "deb"}
            }
        ],
        "descriptor": {"name": "grype", "version": "0.74.0"}
    }"#;

    #[test]
    fn decodes_minimal_report() {
        let report = GrypeFormat.decode(MINIMAL.as_bytes()).unwrap();
        match report {
            Report::VulnScan(r) => {
                assert_eq!(r.matches.len(), 1);
                assert_eq!(r.matches[0].vulnerability.severity, "Critical");
                assert_eq!(r.matches[0].artifact.package_type, "deb");
            }
            other => panic!("unexpected report: {:?}", other.kind()),
        }
    }

    #[test]
    fn rejects_foreign_descriptor() {
        let raw = r#"{"matches": [], "descriptor": {"name": "trivy"}}"#;
        let err = GrypeFormat.decode(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, FormatError::Check { .. }));
    }

    #[test]
    fn rejects_document_without_descriptor() {
        let raw = r#"{"bomFormat": "CycloneDX", "components": [{"name": "a"}]}"#;
        assert!(GrypeFormat.decode(raw.as_bytes()).is_err());
    }

    #[test]
    fn remove_matches_returns_removed() {
        let mut report = GrypeFormat.parse(MINIMAL.as_bytes()).unwrap();
        let removed = report.remove_matches(|m| m.vulnerability.id == "CVE-2023-0001");
        assert_eq!(removed.len(), 1);
        assert!(report.matches.is_empty());
    }

    #[test]
    fn config_defaults_when_section_is_sparse() {
        let config: GrypeConfig = serde_yaml::from_str("critical: 0").unwrap();
        assert_eq!(config.critical, 0);
        assert_eq!(config.high, 0);
        assert_eq!(config.epss_allow_threshold, 0.0);
        assert_eq!(config.epss_deny_threshold, DEFAULT_EPSS_DENY_THRESHOLD);
    }

    #[test]
    fn config_rejects_unknown_field() {
        assert!(serde_yaml::from_str::<GrypeConfig>("critcal: 0").is_err());
    }

    #[test]
    fn config_validate_rejects_threshold_out_of_range() {
        let config = GrypeConfig {
            epss_deny_threshold: 1.5,
            ..GrypeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
