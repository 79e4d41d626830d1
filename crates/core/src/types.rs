//! 도메인 타입 -- 리포트 종류 태그와 콘텐츠 다이제스트
//!
//! 형식 탐지, 번들, 정책 엔진이 공유하는 최소한의 타입입니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// 리포트 종류 태그
///
/// 탐지기가 입력 바이트에 대해 추론하는 닫힌 집합입니다.
/// 어떤 디코더도 인식하지 못한 입력은 [`ReportKind::Generic`]입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// 의존성 취약점 스캔 (Grype)
    VulnScan,
    /// 정적 분석 스캔 (Semgrep)
    StaticScan,
    /// 시크릿 유출 스캔 (Gitleaks)
    SecretScan,
    /// 소프트웨어 자재 명세서 (CycloneDX)
    Sbom,
    /// 정책 설정 문서
    PolicyConfig,
    /// Reportgate 번들
    Bundle,
    /// 인식되지 않은 임의 파일
    Generic,
}

impl ReportKind {
    /// 모든 종류 (표시 순서)
    pub const ALL: [ReportKind; 7] = [
        Self::VulnScan,
        Self::StaticScan,
        Self::SecretScan,
        Self::Sbom,
        Self::PolicyConfig,
        Self::Bundle,
        Self::Generic,
    ];

    /// 사람이 읽을 수 있는 이름을 반환합니다.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::VulnScan => "Anchore Grype Scan Report",
            Self::StaticScan => "Semgrep Scan Report",
            Self::SecretScan => "Gitleaks Scan Report",
            Self::Sbom => "CycloneDX SBOM Report",
            Self::PolicyConfig => "Reportgate Policy Config",
            Self::Bundle => "Reportgate Bundle",
            Self::Generic => "Generic",
        }
    }

    /// 메트릭/로그 레이블용 짧은 이름
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::VulnScan => "vuln_scan",
            Self::StaticScan => "static_scan",
            Self::SecretScan => "secret_scan",
            Self::Sbom => "sbom",
            Self::PolicyConfig => "policy_config",
            Self::Bundle => "bundle",
            Self::Generic => "generic",
        }
    }

    /// 정책 평가 대상인 스캔 리포트인지 여부
    pub fn is_scan_report(&self) -> bool {
        matches!(
            self,
            Self::VulnScan | Self::StaticScan | Self::SecretScan | Self::Sbom
        )
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// SHA-256 콘텐츠 다이제스트
///
/// 생성 시 한 번 계산되며 다시 계산하지 않습니다.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// 바이트 슬라이스의 SHA-256 다이제스트를 계산합니다.
    pub fn sha256(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        Self(out)
    }

    /// 원시 다이제스트 바이트
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 소문자 16진수 문자열
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", hex::encode_upper(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
