//! 정책 설정 문서
//!
//! YAML 문서이며 최상위 `version`은 필수이고 [`POLICY_CONFIG_VERSION`]과 같아야
//! 합니다. 스캐너 계열 섹션(`grype`, `semgrep`, `gitleaks`, `cyclonedx`)은 모두
//! 선택 사항이고, 알 수 없는 필드는 거부됩니다.
//!
//! # 예시
//! ```yaml
//! version: "1"
//! grype:
//!   critical: 0
//!   high: -1
//!   allowList:
//!     - id: CVE-2023-0001
//!       reason: not reachable
//! gitleaks:
//!   secretsAllowed: false
//! ```

use serde::{Deserialize, Serialize};

use reportgate_core::types::ReportKind;

use super::{
    CyclonedxConfig, GitleaksConfig, GrypeConfig, Report, ReportFormat, SemgrepConfig,
};
use crate::error::FormatError;

const FORMAT: &str = "policy config";

/// 지원하는 정책 설정 버전
pub const POLICY_CONFIG_VERSION: &str = "1";

/// 정책 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grype: Option<GrypeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semgrep: Option<SemgrepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitleaks: Option<GitleaksConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclonedx: Option<CyclonedxConfig>,
}

impl Default for PolicyConfig {
    /// 모든 임계값이 무제한(-1)이고 시크릿은 허용하지 않는 설정
    fn default() -> Self {
        Self {
            version: POLICY_CONFIG_VERSION.to_owned(),
            grype: Some(GrypeConfig::default()),
            semgrep: Some(SemgrepConfig::default()),
            gitleaks: Some(GitleaksConfig::default()),
            cyclonedx: Some(CyclonedxConfig::default()),
        }
    }
}

impl PolicyConfig {
    /// 빈 정책 설정 (섹션 없음)
    pub fn empty() -> Self {
        Self {
            version: POLICY_CONFIG_VERSION.to_owned(),
            grype: None,
            semgrep: None,
            gitleaks: None,
            cyclonedx: None,
        }
    }

    /// YAML 바이트에서 정책 설정을 읽고 검사합니다.
    pub fn from_yaml(raw: &[u8]) -> Result<Self, FormatError> {
        let config = PolicyConfigFormat.parse(raw)?;
        PolicyConfigFormat.check(&config)?;
        Ok(config)
    }

    /// YAML 문자열로 직렬화합니다.
    pub fn to_yaml(&self) -> Result<String, FormatError> {
        serde_yaml::to_string(self).map_err(|e| FormatError::parse(FORMAT, e))
    }

    /// `required: true`로 선언된 리포트 종류
    pub fn required_kinds(&self) -> Vec<ReportKind> {
        let mut kinds = Vec::new();
        if self.grype.as_ref().is_some_and(|c| c.required) {
            kinds.push(ReportKind::VulnScan);
        }
        if self.semgrep.as_ref().is_some_and(|c| c.required) {
            kinds.push(ReportKind::StaticScan);
        }
        if self.gitleaks.as_ref().is_some_and(|c| c.required) {
            kinds.push(ReportKind::SecretScan);
        }
        if self.cyclonedx.as_ref().is_some_and(|c| c.required) {
            kinds.push(ReportKind::Sbom);
        }
        kinds
    }
}

/// 정책 설정 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyConfigFormat;

impl ReportFormat for PolicyConfigFormat {
    type Output = PolicyConfig;

    fn kind(&self) -> ReportKind {
        ReportKind::PolicyConfig
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, raw: &[u8]) -> Result<PolicyConfig, FormatError> {
        serde_yaml::from_slice(raw).map_err(|e| FormatError::parse(FORMAT, e))
    }

    fn check(&self, config: &PolicyConfig) -> Result<(), FormatError> {
        if config.version.trim().is_empty() {
            return Err(FormatError::check(FORMAT, "version field cannot be blank"));
        }
        if config.version != POLICY_CONFIG_VERSION {
            return Err(FormatError::UnsupportedVersion {
                format: FORMAT.to_owned(),
                found: config.version.clone(),
                expected: POLICY_CONFIG_VERSION.to_owned(),
            });
        }
        if let Some(grype) = &config.grype {
            grype.validate()?;
        }
        if let Some(semgrep) = &config.semgrep {
            semgrep.validate()?;
        }
        if let Some(cyclonedx) = &config.cyclonedx {
            cyclonedx.validate()?;
        }
        Ok(())
    }

    fn into_report(parsed: PolicyConfig) -> Report {
        Report::PolicyConfig(parsed)
    }
}
