//! # reportgate-policy
//!
//! 스캔 리포트에 정책 임계값을 적용하고 KEV/EPSS 인텔리전스로 보강합니다.
//!
//! # 아키텍처
//!
//! ```text
//! PolicyConfig (YAML) ----------------------------+
//!                                                 v
//! bytes --> FormatDetector --> Report --> [KEV] --> [EPSS] --> RuleRegistry --> Verdict
//!                                 |                               |
//!                                 +--> Bundle --(JoinSet fan-out per label)--> BundleViolations
//! ```
//!
//! # 모듈
//! - [`engine`]: 계열 무관 임계값 엔진 (`Tally`, `Verdict`)
//! - [`rules`]: Grype/Semgrep/Gitleaks/CycloneDX 규칙
//! - [`registry`]: 리포트 종류 -> (디코더, 설정 필드, 규칙) 레지스트리
//! - [`kev`]: CISA KEV 카탈로그 로딩과 매칭
//! - [`epss`]: EPSS 점수 테이블과 적용
//! - [`validate`]: 리포트/번들 검증기
//! - [`error`]: 도메인 에러 타입

pub mod engine;
pub mod epss;
pub mod error;
pub mod kev;
pub mod registry;
pub mod rules;
pub mod validate;

pub use engine::{LevelCount, ListedFinding, Tally, Verdict};
pub use epss::{EpssOutcome, EpssRecord, EpssScore, EpssSource, EpssTable};
pub use error::PolicyError;
pub use kev::{KevCatalog, KevMatch, KevReport};
pub use registry::{RuleEntry, RuleRegistry};
pub use validate::{BundleOutcome, ReportOutcome, ReportValidator, ValidationOutcome};
