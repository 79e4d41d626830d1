//! Reportgate 공통 크레이트
//!
//! 보안 스캔 산출물 게이트키퍼의 모든 크레이트가 공유하는 타입을 정의합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 최상위 에러 (`GateError`), 에러 분류 (`ErrorKind`), 설정 에러 (`ConfigError`)
//! - [`config`]: 애플리케이션 설정 (`GateConfig`, `reportgate.toml`)
//! - [`types`]: 리포트 종류 태그 (`ReportKind`), 콘텐츠 다이제스트 (`Digest`)
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ErrorKind, GateError};

// 설정
pub use config::{BundleConfig, DetectConfig, FeedConfig, GateConfig, GeneralConfig};

// 도메인 타입
pub use types::{Digest, ReportKind};
