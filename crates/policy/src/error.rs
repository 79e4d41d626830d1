//! 정책 크레이트 에러 타입
//!
//! [`PolicyError`]는 정책 평가, 피드 로딩, 번들 검증의 실패를 나타냅니다.
//! [`PolicyError::kind`]로 분류되며 `From<PolicyError> for GateError`가 분류를
//! 유지한 채 상위 에러로 변환합니다.
//!
//! 피드 접근 실패(`Feed`)는 "매칭 없음"이나 "확률 0"과 구분되는 `Api` 분류입니다.

use std::collections::BTreeMap;
use std::fmt;

use reportgate_core::error::{ErrorKind, GateError};
use reportgate_formats::FormatError;

/// 정책 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// 임계값 초과 또는 거부 목록 매칭
    #[error("{family}: {}", .reasons.join(", "))]
    Violation {
        /// 스캐너 계열 필드 이름
        family: String,
        /// 실패 사유 목록
        reasons: Vec<String>,
    },

    /// 리포트 종류에 해당하는 정책 섹션이 없음
    #[error("no configuration provided for field '{field}'")]
    MissingConfig { field: String },

    /// `required: true`인 리포트 종류가 번들에 없음
    #[error("required report type '{field}' is missing from bundle")]
    MissingRequired { field: String },

    /// 정책 규칙이 없는 리포트 종류
    #[error("unsupported report kind for policy evaluation: {kind}")]
    Unsupported { kind: String },

    /// KEV 카탈로그 매칭
    #[error("{count} {} matched to KEV Catalog", vulnerability_noun(.count))]
    KevMatched {
        count: usize,
        /// 매칭에 사용된 카탈로그 버전
        catalog_version: String,
    },

    /// EPSS 거부 임계값 이상
    #[error("{count} vulnerabilities have EPSS scores over deny threshold {threshold:.5}")]
    EpssDenied { count: usize, threshold: f64 },

    /// 한 리포트에서 나온 여러 실패
    #[error("{}", join_errors(.0))]
    Combined(Vec<PolicyError>),

    /// 번들 산출물별 실패 (레이블 순)
    #[error("{}", BundleFailures(.0))]
    BundleViolations(BTreeMap<String, PolicyError>),

    /// 피드 접근 불가 또는 형식 오류
    #[error("{source_name} feed error: {reason}")]
    Feed { source_name: String, reason: String },

    /// 피드 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 형식 탐지/디코딩 에러
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl PolicyError {
    /// 에러를 분류합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Violation { .. }
            | Self::MissingConfig { .. }
            | Self::MissingRequired { .. }
            | Self::KevMatched { .. }
            | Self::EpssDenied { .. }
            | Self::Combined(_)
            | Self::BundleViolations(_) => ErrorKind::Validation,
            Self::Unsupported { .. } => ErrorKind::Encoding,
            Self::Feed { .. } => ErrorKind::Api,
            Self::Io { .. } => ErrorKind::FileAccess,
            Self::Format(e) => e.kind(),
        }
    }

    pub(crate) fn feed(source_name: &str, reason: impl ToString) -> Self {
        Self::Feed {
            source_name: source_name.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// 실패 목록을 하나의 에러로 합칩니다. 비어 있으면 `None`.
    pub(crate) fn combine(mut failures: Vec<PolicyError>) -> Option<PolicyError> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(Self::Combined(failures)),
        }
    }
}

fn vulnerability_noun(count: &usize) -> &'static str {
    if *count == 1 {
        "Vulnerability"
    } else {
        "Vulnerabilities"
    }
}

fn join_errors(errors: &[PolicyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

struct BundleFailures<'a>(&'a BTreeMap<String, PolicyError>);

impl fmt::Display for BundleFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bundle artifact(s) failed validation", self.0.len())?;
        for (label, cause) in self.0 {
            write!(f, "\n  {label}: {cause}")?;
        }
        Ok(())
    }
}

impl From<PolicyError> for GateError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Format(e) => e.into(),
            PolicyError::Io { path, source } => GateError::FileAccess { path, source },
            other => match other.kind() {
                ErrorKind::Api => GateError::Api(other.to_string()),
                ErrorKind::Encoding => GateError::Encoding(other.to_string()),
                _ => GateError::Validation(other.to_string()),
            },
        }
    }
}
