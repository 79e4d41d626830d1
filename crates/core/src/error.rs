//! 에러 타입 -- 최상위 에러와 에러 분류
//!
//! 각 도메인 크레이트는 자체 에러 타입을 정의하고 `From` 변환으로
//! [`GateError`]에 합류합니다. 호출자(CLI)는 [`GateError::kind`]로
//! 종료 코드와 감사(audit) 모드 처리를 결정합니다.

use std::fmt;

/// Reportgate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// 이름이 지정된 입력을 열거나 읽을 수 없음
    #[error("file access error: {path}: {source}")]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 구문/구조 디코딩 실패 (형식 불일치 포함)
    #[error("encoding error: {0}")]
    Encoding(String),

    /// 정책 위반 (임계값 초과, 거부 목록, KEV 매칭, EPSS 거부)
    #[error("validation error: {0}")]
    Validation(String),

    /// 외부 피드 접근 불가 또는 응답 형식 오류
    #[error("api error: {0}")]
    Api(String),

    /// 필수 인자 누락 등 사용자 입력 오류
    #[error("user input error: {0}")]
    UserInput(String),

    /// 마감 시간 초과로 작업이 취소됨
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// 애플리케이션 설정 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl GateError {
    /// 에러를 분류합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileAccess { .. } => ErrorKind::FileAccess,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Api(_) => ErrorKind::Api,
            Self::UserInput(_) => ErrorKind::UserInput,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Config(e) => e.kind(),
        }
    }

    /// 경로 정보를 담은 파일 접근 에러를 생성합니다.
    pub fn file_access(path: impl fmt::Display, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.to_string(),
            source,
        }
    }
}

/// 에러 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileAccess,
    Encoding,
    Validation,
    Api,
    UserInput,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileAccess => "file access",
            Self::Encoding => "encoding",
            Self::Validation => "validation",
            Self::Api => "api",
            Self::UserInput => "user input",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// 설정 에러를 에러 분류에 대응시킵니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::FileAccess,
            Self::ParseFailed { .. } => ErrorKind::Encoding,
            Self::InvalidValue { .. } => ErrorKind::UserInput,
        }
    }
}
