//! 임계값 엔진 -- 수준별 finding 집계와 상한 비교
//!
//! 스캐너 계열과 무관한 공통 알고리즘입니다.
//!
//! 1. 계열이 아는 수준마다 0으로 시작합니다.
//! 2. 허용 목록에 있는 finding은 세지 않고 사유만 기록합니다.
//!    거부 목록에 있는 finding은 수준 상한과 무관하게 따로 기록합니다.
//!    나머지는 수준별로 셉니다.
//! 3. 상한이 `-1`인 수준은 비교하지 않고, `found > ceiling`이면 실패입니다.
//! 4. 수준별 실패와 거부 매칭을 하나의 [`Verdict`]로 모읍니다.
//!
//! 계열이 모르는 수준은 별도로 세지만 비교하지는 않습니다.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use reportgate_formats::{ListItem, UNLIMITED};

use crate::error::PolicyError;

/// 수준별 집계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelCount {
    pub level: String,
    pub found: u64,
    /// 설정된 상한 (`-1`은 무제한)
    pub ceiling: i64,
}

/// 목록에 매칭된 finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedFinding {
    pub id: String,
    pub level: String,
    pub reason: String,
}

/// 계열 하나의 평가 결과
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// 스캐너 계열 필드 이름 (`grype`, `semgrep`, ...)
    pub family: String,
    pub counts: Vec<LevelCount>,
    /// 계열이 모르는 수준의 집계 (비교하지 않음)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub uncategorized: BTreeMap<String, u64>,
    pub allowed: Vec<ListedFinding>,
    pub denied: Vec<ListedFinding>,
    pub violations: Vec<String>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// 집계된 finding 수 (허용 목록 제외)
    pub fn total_counted(&self) -> u64 {
        self.counts.iter().map(|c| c.found).sum::<u64>()
            + self.uncategorized.values().sum::<u64>()
    }

    /// 특정 수준의 집계
    pub fn count(&self, level: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|c| c.level == level)
            .map(|c| c.found)
    }

    /// 위반이 있으면 [`PolicyError::Violation`]을 만듭니다.
    pub fn check(&self) -> Result<(), PolicyError> {
        if self.passed() {
            return Ok(());
        }
        Err(PolicyError::Violation {
            family: self.family.clone(),
            reasons: self.violations.clone(),
        })
    }
}

/// finding 집계기
pub struct Tally<'a> {
    family: &'static str,
    counts: Vec<LevelCount>,
    uncategorized: BTreeMap<String, u64>,
    allow_list: &'a [ListItem],
    deny_list: &'a [ListItem],
    allowed: Vec<ListedFinding>,
    denied: Vec<ListedFinding>,
}

impl<'a> Tally<'a> {
    /// 수준별 상한과 허용/거부 목록으로 집계기를 생성합니다.
    pub fn new(
        family: &'static str,
        ceilings: &[(&'static str, i64)],
        allow_list: &'a [ListItem],
        deny_list: &'a [ListItem],
    ) -> Self {
        Self {
            family,
            counts: ceilings
                .iter()
                .map(|(level, ceiling)| LevelCount {
                    level: (*level).to_owned(),
                    found: 0,
                    ceiling: *ceiling,
                })
                .collect(),
            uncategorized: BTreeMap::new(),
            allow_list,
            deny_list,
            allowed: Vec::new(),
            denied: Vec::new(),
        }
    }

    /// finding 하나를 기록합니다.
    pub fn record(&mut self, id: &str, level: &str) {
        if let Some(item) = self.allow_list.iter().find(|item| item.id == id) {
            info!(family = self.family, id = %id, reason = %item.reason, "finding allowed");
            self.allowed.push(ListedFinding {
                id: id.to_owned(),
                level: level.to_owned(),
                reason: item.reason.clone(),
            });
            return;
        }

        if let Some(item) = self.deny_list.iter().find(|item| item.id == id) {
            warn!(family = self.family, id = %id, reason = %item.reason, "finding denied");
            self.denied.push(ListedFinding {
                id: id.to_owned(),
                level: level.to_owned(),
                reason: item.reason.clone(),
            });
            return;
        }

        match self.counts.iter_mut().find(|c| c.level == level) {
            Some(count) => count.found += 1,
            None => *self.uncategorized.entry(level.to_owned()).or_default() += 1,
        }
    }

    /// 상한과 비교하여 평가 결과를 만듭니다.
    pub fn finish(self) -> Verdict {
        let mut violations: Vec<String> = self
            .counts
            .iter()
            .filter(|c| c.ceiling != UNLIMITED && c.found as i128 > c.ceiling as i128)
            .map(|c| format!("{} ({} found > {} allowed)", c.level, c.found, c.ceiling))
            .collect();

        if !self.denied.is_empty() {
            let ids: Vec<String> = self
                .denied
                .iter()
                .map(|d| {
                    if d.reason.is_empty() {
                        d.id.clone()
                    } else {
                        format!("{} ({})", d.id, d.reason)
                    }
                })
                .collect();
            violations.push(format!("Denied: {}", ids.join(", ")));
        }

        let summary: Vec<String> = self
            .counts
            .iter()
            .map(|c| format!("{}={}", c.level, c.found))
            .collect();
        info!(
            family = self.family,
            findings = %summary.join(" "),
            allowed = self.allowed.len(),
            denied = self.denied.len(),
            "findings tallied"
        );

        Verdict {
            family: self.family.to_owned(),
            counts: self.counts,
            uncategorized: self.uncategorized,
            allowed: self.allowed,
            denied: self.denied,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [&str; 2] = ["Critical", "High"];

    fn tally_of(ceilings: [i64; 2], allow: &[ListItem], deny: &[ListItem]) -> Verdict {
        let ceilings = [(LEVELS[0], ceilings[0]), (LEVELS[1], ceilings[1])];
        let mut tally = Tally::new("grype", &ceilings, allow, deny);
        for (id, level) in [
            ("CVE-1", "Critical"),
            ("CVE-2", "Critical"),
            ("CVE-3", "Critical"),
            ("CVE-4", "High"),
        ] {
            tally.record(id, level);
        }
        tally.finish()
    }

    #[test]
    fn zero_ceiling_fails() {
        let verdict = tally_of([0, -1], &[], &[]);
        assert!(!verdict.passed());
        assert_eq!(verdict.violations, vec!["Critical (3 found > 0 allowed)"]);
    }

    #[test]
    fn unlimited_ceilings_pass() {
        let verdict = tally_of([-1, -1], &[], &[]);
        assert!(verdict.passed());
        assert_eq!(verdict.count("Critical"), Some(3));
        assert_eq!(verdict.count("High"), Some(1));
    }

    #[test]
    fn equal_count_passes() {
        assert!(tally_of([3, 1], &[], &[]).passed());
        assert!(!tally_of([2, 1], &[], &[]).passed());
    }

    #[test]
    fn allowed_findings_are_not_counted() {
        let allow = [ListItem::new("CVE-2", "false positive")];
        let verdict = tally_of([2, -1], &allow, &[]);
        assert!(verdict.passed());
        assert_eq!(verdict.count("Critical"), Some(2));
        assert_eq!(verdict.allowed[0].reason, "false positive");
    }

    #[test]
    fn deny_match_fails_even_when_unlimited() {
        let deny = [ListItem::new("CVE-4", "known bad")];
        let verdict = tally_of([-1, -1], &[], &deny);
        assert!(!verdict.passed());
        assert_eq!(verdict.violations, vec!["Denied: CVE-4 (known bad)"]);
        assert_eq!(verdict.count("High"), Some(0));
    }

    #[test]
    fn deny_entry_absent_from_report_is_ignored() {
        let deny = [ListItem::new("CVE-999", "")];
        assert!(tally_of([-1, -1], &[], &deny).passed());
    }

    #[test]
    fn unknown_level_is_counted_but_not_compared() {
        let ceilings = [("ERROR", 0)];
        let mut tally = Tally::new("semgrep", &ceilings, &[], &[]);
        tally.record("rule.a", "INVENTORY");
        let verdict = tally.finish();
        assert!(verdict.passed());
        assert_eq!(verdict.uncategorized.get("INVENTORY"), Some(&1));
        assert_eq!(verdict.total_counted(), 1);
    }

    #[test]
    fn check_carries_reasons() {
        let err = tally_of([0, 0], &[], &[]).check().unwrap_err();
        assert_eq!(
            err.to_string(),
            "grype: Critical (3 found > 0 allowed), High (1 found > 0 allowed)"
        );
    }
}
