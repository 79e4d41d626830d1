//! 형식 크레이트 에러 타입
//!
//! [`FormatError`]는 디코딩, 형식 탐지, 번들 직렬화 과정의 모든 실패를 나타냅니다.
//! `From<FormatError> for GateError` 구현을 통해 `?` 연산자로 상위 에러 타입으로
//! 전파되며, 변환 시 에러 분류(Encoding / Cancelled / FileAccess / UserInput)가
//! 유지됩니다.
//!
//! # 에러 카테고리
//!
//! - **구문 파싱**: `Parse`
//! - **구조 검사**: `Check`, `UnsupportedVersion`
//! - **형식 탐지**: `NoMatchingFormat`, `Cancelled`, `Task`
//! - **번들 와이어 형식**: `Wire`, `TooLarge`
//! - **번들 조작**: `LabelNotFound`
//! - **파일 I/O**: `Io`

use reportgate_core::error::{ErrorKind, GateError};

/// 형식 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// 대상 스키마의 구문 파싱 실패
    #[error("{format}: parse failed: {reason}")]
    Parse {
        /// 시도한 형식 이름
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 구문은 유효하지만 구조 검사에 실패
    #[error("{format}: structural check failed: {reason}")]
    Check {
        /// 시도한 형식 이름
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 문서 버전
    #[error("{format}: unsupported version '{found}' (expected '{expected}')")]
    UnsupportedVersion {
        format: String,
        found: String,
        expected: String,
    },

    /// 등록된 어떤 디코더도 입력을 인식하지 못함
    #[error("no matching format ({tried} decoders tried)")]
    NoMatchingFormat {
        /// 시도한 디코더 수
        tried: usize,
    },

    /// 마감 시간 안에 어떤 디코더도 성공하지 못함
    #[error("format detection cancelled after {timeout_ms}ms")]
    Cancelled {
        /// 호출자가 지정한 마감 시간 (밀리초)
        timeout_ms: u128,
    },

    /// 디코더 태스크 실행 실패
    #[error("decoder task failed: {0}")]
    Task(String),

    /// 번들 와이어 형식 오류
    #[error("bundle wire format error: {reason}")]
    Wire { reason: String },

    /// 압축 해제 크기 초과
    #[error("bundle too large: more than {max} bytes after decompression")]
    TooLarge { max: u64 },

    /// 번들에 레이블이 없음
    #[error("label not found in bundle: {label}")]
    LabelNotFound { label: String },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    /// 에러를 분류합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::LabelNotFound { .. } => ErrorKind::UserInput,
            Self::Io { .. } => ErrorKind::FileAccess,
            _ => ErrorKind::Encoding,
        }
    }

    pub(crate) fn parse(format: &str, reason: impl ToString) -> Self {
        Self::Parse {
            format: format.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn check(format: &str, reason: impl ToString) -> Self {
        Self::Check {
            format: format.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn wire(reason: impl ToString) -> Self {
        Self::Wire {
            reason: reason.to_string(),
        }
    }
}

impl From<FormatError> for GateError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Cancelled { .. } => GateError::Cancelled(err.to_string()),
            FormatError::LabelNotFound { .. } => GateError::UserInput(err.to_string()),
            FormatError::Io { path, source } => GateError::FileAccess { path, source },
            other => GateError::Encoding(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = FormatError::parse("grype", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "grype: parse failed: expected value at line 1"
        );
    }

    #[test]
    fn no_match_converts_to_encoding() {
        let gate: GateError = FormatError::NoMatchingFormat { tried: 6 }.into();
        assert_eq!(gate.kind(), ErrorKind::Encoding);
        assert!(gate.to_string().contains("6 decoders"));
    }

    #[test]
    fn cancelled_keeps_its_kind() {
        let gate: GateError = FormatError::Cancelled { timeout_ms: 0 }.into();
        assert_eq!(gate.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn io_converts_to_file_access() {
        let err = FormatError::Io {
            path: "bundle.gz".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let gate: GateError = err.into();
        assert_eq!(gate.kind(), ErrorKind::FileAccess);
        assert!(gate.to_string().contains("bundle.gz"));
    }

    #[test]
    fn missing_label_is_user_input() {
        let gate: GateError = FormatError::LabelNotFound {
            label: "grype.json".to_owned(),
        }
        .into();
        assert_eq!(gate.kind(), ErrorKind::UserInput);
    }
}
