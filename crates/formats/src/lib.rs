//! # reportgate-formats
//!
//! 스캔 산출물의 형식 탐지, 디코딩, 번들 아카이브를 담당합니다.
//!
//! # 아키텍처
//!
//! ```text
//! raw bytes --> FormatDetector --(race)--> [Grype | Semgrep | Gitleaks | CycloneDX | PolicyConfig | Bundle]
//!                    |                                    |
//!                    |                            first structural success
//!                    v                                    v
//!              Artifact { label, digest, kind }        Report (closed sum type)
//!
//! Bundle { version, artifacts } <--encode/decode--> gzip( CBOR { version, artifacts } )
//! ```
//!
//! # 모듈
//! - [`report`]: 형식별 스키마와 디코더, [`Report`] 합 타입
//! - [`detector`]: 동시 형식 탐지기
//! - [`artifact`]: 다이제스트가 붙은 산출물
//! - [`bundle`]: 번들 아카이브와 요약
//! - [`error`]: 도메인 에러 타입

pub mod artifact;
pub mod bundle;
pub mod detector;
pub mod error;
pub mod report;

pub use artifact::{Artifact, human_size, label_from_path};
pub use bundle::{BUNDLE_VERSION, Bundle, BundleFormat, BundleSummary, SummaryEntry};
pub use detector::FormatDetector;
pub use error::FormatError;
pub use report::{
    CyclonedxConfig, CyclonedxFormat, CyclonedxReport, GitleaksConfig, GitleaksFormat,
    GitleaksReport, GrypeConfig, GrypeFormat, GrypeReport, ListItem, PolicyConfig,
    PolicyConfigFormat, Report, ReportDecoder, ReportFormat, SemgrepConfig, SemgrepFormat,
    SemgrepReport, UNLIMITED, default_decoders,
};
