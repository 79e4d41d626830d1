//! 리포트 디코딩 모듈 -- 스캐너 계열별 스키마와 디코더
//!
//! 각 디코더는 두 단계 순수 함수 쌍입니다.
//!
//! 1. [`ReportFormat::parse`]: 대상 스키마로의 구문 파싱
//! 2. [`ReportFormat::check`]: "정말 이 형식의 올바른 인스턴스인가" 구조 검사
//!
//! 두 단계를 모두 통과해야 [`Report`]로 승격됩니다. [`ReportFormat`]을 구현한
//! 모든 타입은 blanket impl로 객체 안전한 [`ReportDecoder`]가 되어 탐지기에
//! 등록될 수 있습니다.
//!
//! # 지원 형식
//! - 취약점 스캔: Grype ([`GrypeFormat`])
//! - 정적 분석: Semgrep ([`SemgrepFormat`])
//! - 시크릿 유출: Gitleaks ([`GitleaksFormat`])
//! - SBOM: CycloneDX ([`CyclonedxFormat`])
//! - 정책 설정 ([`PolicyConfigFormat`])
//! - 번들 ([`BundleFormat`](crate::bundle::BundleFormat))

pub mod cyclonedx;
pub mod gitleaks;
pub mod grype;
pub mod policy;
pub mod semgrep;

pub use cyclonedx::{CyclonedxConfig, CyclonedxFormat, CyclonedxReport};
pub use gitleaks::{GitleaksConfig, GitleaksFormat, GitleaksReport};
pub use grype::{GrypeConfig, GrypeFormat, GrypeReport};
pub use policy::{PolicyConfig, PolicyConfigFormat};
pub use semgrep::{SemgrepConfig, SemgrepFormat, SemgrepReport};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use reportgate_core::types::ReportKind;

use crate::bundle::{Bundle, BundleFormat};
use crate::error::FormatError;

/// 디코딩된 리포트
///
/// 탐지 결과의 닫힌 합 타입입니다. 호출 지점은 `match`로 모든 종류를 다룹니다.
#[derive(Debug, Clone)]
pub enum Report {
    VulnScan(GrypeReport),
    StaticScan(SemgrepReport),
    SecretScan(GitleaksReport),
    Sbom(CyclonedxReport),
    PolicyConfig(PolicyConfig),
    Bundle(Bundle),
    /// 어떤 형식과도 일치하지 않는 입력
    Generic,
}

impl Report {
    /// 리포트 종류 태그를 반환합니다.
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::VulnScan(_) => ReportKind::VulnScan,
            Self::StaticScan(_) => ReportKind::StaticScan,
            Self::SecretScan(_) => ReportKind::SecretScan,
            Self::Sbom(_) => ReportKind::Sbom,
            Self::PolicyConfig(_) => ReportKind::PolicyConfig,
            Self::Bundle(_) => ReportKind::Bundle,
            Self::Generic => ReportKind::Generic,
        }
    }
}

/// 스키마별 디코더
///
/// `parse`는 구문만, `check`는 구조 불변식만 담당합니다.
pub trait ReportFormat: Send + Sync + 'static {
    /// 파싱 결과 타입
    type Output;

    /// 이 디코더가 생성하는 리포트 종류
    fn kind(&self) -> ReportKind;

    /// 로그/에러에 쓰이는 형식 이름
    fn format_name(&self) -> &'static str;

    /// 구문 파싱
    fn parse(&self, raw: &[u8]) -> Result<Self::Output, FormatError>;

    /// 구조 검사
    fn check(&self, parsed: &Self::Output) -> Result<(), FormatError>;

    /// 검사를 통과한 결과를 [`Report`]로 감쌉니다.
    fn into_report(parsed: Self::Output) -> Report;
}

/// 탐지기에 등록되는 객체 안전 디코더
pub trait ReportDecoder: Send + Sync {
    fn kind(&self) -> ReportKind;

    fn format_name(&self) -> &'static str;

    /// 파싱과 구조 검사를 모두 수행합니다.
    fn decode(&self, raw: &[u8]) -> Result<Report, FormatError>;
}

impl<F: ReportFormat> ReportDecoder for F {
    fn kind(&self) -> ReportKind {
        ReportFormat::kind(self)
    }

    fn format_name(&self) -> &'static str {
        ReportFormat::format_name(self)
    }

    fn decode(&self, raw: &[u8]) -> Result<Report, FormatError> {
        let parsed = self.parse(raw)?;
        self.check(&parsed)?;
        Ok(F::into_report(parsed))
    }
}

/// 기본 디코더 세트
///
/// Grype, Semgrep, Gitleaks, CycloneDX, 정책 설정, 번들 순서입니다.
/// 번들 디코더는 `max_decompressed_bytes`로 압축 해제 크기를 제한합니다.
pub fn default_decoders(max_decompressed_bytes: u64) -> Vec<Arc<dyn ReportDecoder>> {
    vec![
        Arc::new(GrypeFormat),
        Arc::new(SemgrepFormat),
        Arc::new(GitleaksFormat),
        Arc::new(CyclonedxFormat),
        Arc::new(PolicyConfigFormat),
        Arc::new(BundleFormat::new(max_decompressed_bytes)),
    ]
}

/// 허용/거부 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListItem {
    /// 취약점 ID 또는 규칙 ID
    pub id: String,
    /// 사람이 읽을 수 있는 사유
    #[serde(default)]
    pub reason: String,
}

impl ListItem {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// 무제한 임계값
pub const UNLIMITED: i64 = -1;

/// JSON 문서를 파싱합니다.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    format: &str,
    raw: &[u8],
) -> Result<T, FormatError> {
    serde_json::from_slice(raw).map_err(|e| FormatError::parse(format, e))
}

/// 임계값이 -1 이상인지 검사합니다.
pub(crate) fn check_ceilings(
    format: &str,
    ceilings: &[(&'static str, i64)],
) -> Result<(), FormatError> {
    for (level, ceiling) in ceilings {
        if *ceiling < UNLIMITED {
            return Err(FormatError::check(
                format,
                format!("ceiling for '{level}' must be -1 (unlimited) or greater, got {ceiling}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_decoders_cover_every_known_kind() {
        let kinds: Vec<_> = default_decoders(1024).iter().map(|d| d.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ReportKind::VulnScan,
                ReportKind::StaticScan,
                ReportKind::SecretScan,
                ReportKind::Sbom,
                ReportKind::PolicyConfig,
                ReportKind::Bundle,
            ]
        );
    }

    #[test]
    fn every_decoder_rejects_empty_input() {
        for decoder in default_decoders(1024) {
            assert!(
                decoder.decode(b"").is_err(),
                "{} accepted empty input",
                decoder.format_name()
            );
        }
    }

    #[test]
    fn ceilings_below_unlimited_are_rejected() {
        assert!(check_ceilings("grype", &[("critical", -1), ("high", 0)]).is_ok());
        let err = check_ceilings("grype", &[("critical", -2)]).unwrap_err();
        assert!(err.to_string().contains("critical"));
    }

    #[test]
    fn list_item_reason_is_optional() {
        let item: ListItem = serde_yaml::from_str("id: CVE-2023-0001").unwrap();
        assert_eq!(item, ListItem::new("CVE-2023-0001", ""));
    }
}
