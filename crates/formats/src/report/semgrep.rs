//! Semgrep 정적 분석 리포트
//!
//! 구조 검사: `results`, `errors`, `paths.scanned` 세 컬렉션이 모두 존재해야
//! 합니다 (비어 있어도 됨, `null`이거나 누락되면 실패).

use serde::{Deserialize, Serialize};

use reportgate_core::types::ReportKind;

use super::{ListItem, Report, ReportFormat, check_ceilings, parse_json};
use crate::error::FormatError;

const FORMAT: &str = "semgrep";

/// Semgrep 심각도 순서
pub const SEVERITIES: [&str; 3] = ["ERROR", "WARNING", "INFO"];

/// Semgrep 스캔 리포트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemgrepReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub results: Option<Vec<SemgrepResult>>,
    pub errors: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub paths: SemgrepPaths,
}

impl SemgrepReport {
    /// 결과 목록 (없으면 빈 슬라이스)
    pub fn findings(&self) -> &[SemgrepResult] {
        self.results.as_deref().unwrap_or_default()
    }
}

/// 스캔 경로
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemgrepPaths {
    pub scanned: Option<Vec<String>>,
}

/// 단일 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemgrepResult {
    pub check_id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub start: SemgrepPosition,
    #[serde(default)]
    pub end: SemgrepPosition,
    #[serde(default)]
    pub extra: SemgrepExtra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemgrepPosition {
    #[serde(default)]
    pub line: u64,
    #[serde(default)]
    pub col: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemgrepExtra {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl SemgrepExtra {
    /// 메타데이터의 문자열 또는 문자열 배열 필드를 읽습니다.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }
}

/// Semgrep 정책 설정 (`semgrep:` 섹션)
///
/// 허용/거부 목록은 규칙 `check_id`와 비교합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SemgrepConfig {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub info: i64,
    #[serde(default)]
    pub warning: i64,
    #[serde(default)]
    pub error: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_list: Vec<ListItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_list: Vec<ListItem>,
}

impl SemgrepConfig {
    pub fn ceilings(&self) -> [(&'static str, i64); 3] {
        [
            ("ERROR", self.error),
            ("WARNING", self.warning),
            ("INFO", self.info),
        ]
    }

    pub(crate) fn validate(&self) -> Result<(), FormatError> {
        check_ceilings("semgrep config", &self.ceilings())
    }
}

impl Default for SemgrepConfig {
    fn default() -> Self {
        Self {
            required: false,
            info: -1,
            warning: -1,
            error: -1,
            allow_list: Vec::new(),
            deny_list: Vec::new(),
        }
    }
}

/// Semgrep 리포트 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct SemgrepFormat;

impl ReportFormat for SemgrepFormat {
    type Output = SemgrepReport;

    fn kind(&self) -> ReportKind {
        ReportKind::StaticScan
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, raw: &[u8]) -> Result<SemgrepReport, FormatError> {
        parse_json(FORMAT, raw)
    }

    fn check(&self, report: &SemgrepReport) -> Result<(), FormatError> {
        if report.results.is_none() {
            return Err(FormatError::check(FORMAT, "required field 'results' is missing"));
        }
        if report.errors.is_none() {
            return Err(FormatError::check(FORMAT, "required field 'errors' is missing"));
        }
        if report.paths.scanned.is_none() {
            return Err(FormatError::check(
                FORMAT,
                "required field 'paths.scanned' is missing",
            ));
        }
        Ok(())
    }

    fn into_report(parsed: SemgrepReport) -> Report {
        Report::StaticScan(parsed)
    }
}
