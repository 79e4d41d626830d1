//! CycloneDX SBOM 리포트
//!
//! 구조 검사: 컴포넌트 또는 취약점 레코드가 하나 이상 있어야 합니다.
//!
//! [`CyclonedxReport::shim_components_as_vulnerabilities`]는 취약점 레코드가 없는
//! 컴포넌트를 심각도 `none`인 합성 finding으로 재해석합니다. 명시적으로 호출할
//! 때만 적용됩니다.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use reportgate_core::types::ReportKind;

use super::{ListItem, Report, ReportFormat, check_ceilings, parse_json};
use crate::error::FormatError;

const FORMAT: &str = "cyclonedx";

/// CycloneDX 심각도 순서
pub const SEVERITIES: [&str; 7] = ["critical", "high", "medium", "low", "info", "none", "unknown"];

/// 합성 finding에 부여하는 심각도
pub const SHIM_SEVERITY: &str = "none";

/// CycloneDX SBOM 문서
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclonedxReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<CdxComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<CdxVulnerability>>,
}

impl CyclonedxReport {
    pub fn components(&self) -> &[CdxComponent] {
        self.components.as_deref().unwrap_or_default()
    }

    pub fn vulnerabilities(&self) -> &[CdxVulnerability] {
        self.vulnerabilities.as_deref().unwrap_or_default()
    }

    /// 취약점이 없는 컴포넌트를 심각도 `none` 취약점으로 추가한 사본을 반환합니다.
    ///
    /// 컴포넌트 참조는 `bom-ref`, 없으면 `name@version`입니다.
    pub fn shim_components_as_vulnerabilities(&self) -> CyclonedxReport {
        let affected: HashSet<&str> = self
            .vulnerabilities()
            .iter()
            .flat_map(|v| v.affects.iter().map(|a| a.reference.as_str()))
            .collect();

        let mut shimmed = self.clone();
        let synthetic: Vec<CdxVulnerability> = self
            .components()
            .iter()
            .filter_map(|component| {
                let reference = component.reference();
                if affected.contains(reference.as_str()) {
                    return None;
                }
                Some(CdxVulnerability {
                    id: reference.clone(),
                    bom_ref: None,
                    description: Some(format!("component {} has no known vulnerability", component.name)),
                    ratings: vec![CdxRating {
                        severity: Some(SHIM_SEVERITY.to_owned()),
                        score: None,
                    }],
                    affects: vec![CdxAffect { reference }],
                })
            })
            .collect();

        shimmed
            .vulnerabilities
            .get_or_insert_with(Vec::new)
            .extend(synthetic);
        shimmed
    }
}

/// 소프트웨어 컴포넌트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxComponent {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(rename = "type", default)]
    pub component_type: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
}

impl CdxComponent {
    /// 취약점 `affects[].ref`와 비교할 참조
    pub fn reference(&self) -> String {
        match &self.bom_ref {
            Some(r) if !r.is_empty() => r.clone(),
            _ => format!("{}@{}", self.name, self.version),
        }
    }
}

/// 취약점 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxVulnerability {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ratings: Vec<CdxRating>,
    #[serde(default)]
    pub affects: Vec<CdxAffect>,
}

impl CdxVulnerability {
    /// 첫 번째 등급의 심각도 (소문자, 없으면 `unknown`)
    pub fn severity(&self) -> String {
        self.ratings
            .iter()
            .find_map(|r| r.severity.as_deref())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "unknown".to_owned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxRating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdxAffect {
    #[serde(rename = "ref")]
    pub reference: String,
}

/// CycloneDX 정책 설정 (`cyclonedx:` 섹션)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CyclonedxConfig {
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
    pub info: i64,
    #[serde(default)]
    pub none: i64,
    #[serde(default)]
    pub unknown: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_list: Vec<ListItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_list: Vec<ListItem>,
}

impl CyclonedxConfig {
    pub fn ceilings(&self) -> [(&'static str, i64); 7] {
        [
            ("critical", self.critical),
            ("high", self.high),
            ("medium", self.medium),
            ("low", self.low),
            ("info", self.info),
            ("none", self.none),
            ("unknown", self.unknown),
        ]
    }

    pub(crate) fn validate(&self) -> Result<(), FormatError> {
        check_ceilings("cyclonedx config", &self.ceilings())
    }
}

impl Default for CyclonedxConfig {
    fn default() -> Self {
        Self {
            required: false,
            critical: -1,
            high: -1,
            medium: -1,
            low: -1,
            info: -1,
            none: -1,
            unknown: -1,
            allow_list: Vec::new(),
            deny_list: Vec::new(),
        }
    }
}

/// CycloneDX 리포트 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclonedxFormat;

impl ReportFormat for CyclonedxFormat {
    type Output = CyclonedxReport;

    fn kind(&self) -> ReportKind {
        ReportKind::Sbom
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, raw: &[u8]) -> Result<CyclonedxReport, FormatError> {
        parse_json(FORMAT, raw)
    }

    fn check(&self, report: &CyclonedxReport) -> Result<(), FormatError> {
        if report.components().is_empty() && report.vulnerabilities().is_empty() {
            return Err(FormatError::check(
                FORMAT,
                "document has no components and no vulnerabilities",
            ));
        }
        Ok(())
    }

    fn into_report(parsed: CyclonedxReport) -> Report {
        Report::Sbom(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportDecoder;

    fn component(reference: &str) -> CdxComponent {
        CdxComponent {
            bom_ref: Some(reference.to_owned()),
            component_type: "library".to_owned(),
            name: format!("{reference}-name"),
            version: "1.0.0".to_owned(),
            purl: None,
        }
    }

    fn vulnerability(id: &str, severity: &str, affects: &str) -> CdxVulnerability {
        CdxVulnerability {
            id: id.to_owned(),
            bom_ref: None,
            description: None,
            ratings: vec![CdxRating {
                severity: Some(severity.to_owned()),
                score: None,
            }],
            affects: vec![CdxAffect {
                reference: affects.to_owned(),
            }],
        }
    }

    #[test]
    fn empty_sbom_fails_check() {
        let raw = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5", "components": []}"#;
        assert!(CyclonedxFormat.decode(raw.as_bytes()).is_err());
    }

    #[test]
    fn sbom_with_components_is_accepted() {
        let raw = r#"{"bomFormat": "CycloneDX", "components": [{"bom-ref": "pkg:a", "type": "library", "name": "a", "version": "1"}]}"#;
        assert!(matches!(
            CyclonedxFormat.decode(raw.as_bytes()).unwrap(),
            Report::Sbom(_)
        ));
    }

    #[test]
    fn severity_falls_back_to_unknown() {
        let mut vuln = vulnerability("CVE-1", "High", "a");
        assert_eq!(vuln.severity(), "high");
        vuln.ratings.clear();
        assert_eq!(vuln.severity(), "unknown");
    }

    #[test]
    fn shim_adds_only_unaffected_components() {
        let report = CyclonedxReport {
            components: Some(vec![component("a"), component("b"), component("c")]),
            vulnerabilities: Some(vec![
                vulnerability("CVE-2023-1", "critical", "a"),
                vulnerability("CVE-2023-2", "low", "b"),
            ]),
            ..CyclonedxReport::default()
        };

        let shimmed = report.shim_components_as_vulnerabilities();
        assert_eq!(shimmed.vulnerabilities().len(), 3);
        let synthetic = &shimmed.vulnerabilities()[2];
        assert_eq!(synthetic.id, "c");
        assert_eq!(synthetic.severity(), SHIM_SEVERITY);
        // 원본은 변경되지 않음
        assert_eq!(report.vulnerabilities().len(), 2);
    }

    #[test]
    fn component_reference_without_bom_ref() {
        let mut c = component("x");
        c.bom_ref = None;
        assert_eq!(c.reference(), "x-name@1.0.0");
    }
}
