//! Gitleaks 시크릿 유출 리포트
//!
//! 리포트는 finding 배열입니다. 리터럴 `[]`은 "발견 없음"으로 특별 처리되고,
//! 비어 있지 않은 배열은 모든 항목이 비어 있지 않은 `RuleID`를 가져야 합니다.

use serde::{Deserialize, Serialize};

use reportgate_core::types::ReportKind;

use super::{Report, ReportFormat, parse_json};
use crate::error::FormatError;

const FORMAT: &str = "gitleaks";

/// Gitleaks 스캔 리포트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GitleaksReport(pub Vec<GitleaksFinding>);

impl GitleaksReport {
    pub fn findings(&self) -> &[GitleaksFinding] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 단일 시크릿 finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitleaksFinding {
    #[serde(rename = "RuleID")]
    pub rule_id: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "File", default)]
    pub file: String,
    #[serde(rename = "StartLine", default)]
    pub start_line: u64,
    #[serde(rename = "Secret", default)]
    pub secret: String,
    #[serde(rename = "Commit", default)]
    pub commit: String,
    #[serde(rename = "Fingerprint", default)]
    pub fingerprint: String,
}

/// Gitleaks 정책 설정 (`gitleaks:` 섹션)
///
/// 심각도별 임계값 대신 "시크릿 허용 여부" 하나만 가집니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GitleaksConfig {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub secrets_allowed: bool,
}

/// Gitleaks 리포트 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct GitleaksFormat;

impl ReportFormat for GitleaksFormat {
    type Output = GitleaksReport;

    fn kind(&self) -> ReportKind {
        ReportKind::SecretScan
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, raw: &[u8]) -> Result<GitleaksReport, FormatError> {
        if raw.trim_ascii() == b"[]" {
            return Ok(GitleaksReport::default());
        }
        parse_json(FORMAT, raw)
    }

    fn check(&self, report: &GitleaksReport) -> Result<(), FormatError> {
        if let Some(index) = report.0.iter().position(|f| f.rule_id.trim().is_empty()) {
            return Err(FormatError::check(
                FORMAT,
                format!("finding #{index} has an empty rule id"),
            ));
        }
        Ok(())
    }

    fn into_report(parsed: GitleaksReport) -> Report {
        Report::SecretScan(parsed)
    }
}
