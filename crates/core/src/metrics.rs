//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다. 각 크레이트는 이 상수로
//! `metrics::counter!()` 매크로를 호출합니다. 바이너리는 익스포터를 설치하지
//! 않으므로 기본 동작은 no-op 입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `reportgate_`
//! - 모듈명: `detect_`, `bundle_`, `policy_`, `enrich_`
//! - 접미어: `_total` (counter)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 리포트 종류 레이블 키
pub const LABEL_KIND: &str = "kind";

/// 결과 레이블 키 (pass, fail)
pub const LABEL_RESULT: &str = "result";

/// 피드 레이블 키 (kev, epss)
pub const LABEL_FEED: &str = "feed";

// ─── 형식 탐지 ─────────────────────────────────────────────────────

/// 탐지 성공 수 (counter, label: kind)
pub const DETECT_MATCHED_TOTAL: &str = "reportgate_detect_matched_total";

/// 어떤 디코더도 매칭되지 않은 수 (counter)
pub const DETECT_UNMATCHED_TOTAL: &str = "reportgate_detect_unmatched_total";

/// 마감 시간 초과로 취소된 탐지 수 (counter)
pub const DETECT_CANCELLED_TOTAL: &str = "reportgate_detect_cancelled_total";

// ─── 번들 ──────────────────────────────────────────────────────────

/// 인코딩된 번들 수 (counter)
pub const BUNDLE_ENCODED_TOTAL: &str = "reportgate_bundle_encoded_total";

/// 디코딩된 번들 수 (counter)
pub const BUNDLE_DECODED_TOTAL: &str = "reportgate_bundle_decoded_total";

// ─── 정책 ──────────────────────────────────────────────────────────

/// 정책 평가 수 (counter, labels: kind, result)
pub const POLICY_EVALUATIONS_TOTAL: &str = "reportgate_policy_evaluations_total";

/// 번들 검증 중 건너뛴 generic 산출물 수 (counter)
pub const POLICY_SKIPPED_TOTAL: &str = "reportgate_policy_skipped_total";

// ─── 인리치먼트 ─────────────────────────────────────────────────────

/// 피드 매칭/거부된 취약점 수 (counter, label: feed)
pub const ENRICH_FLAGGED_TOTAL: &str = "reportgate_enrich_flagged_total";

/// EPSS 허용 임계값으로 제거된 취약점 수 (counter)
pub const ENRICH_REMOVED_TOTAL: &str = "reportgate_enrich_removed_total";
