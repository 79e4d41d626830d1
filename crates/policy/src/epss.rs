//! EPSS(Exploit Prediction Scoring System) 점수 적용
//!
//! 취약점 리포트의 모든 finding에 악용 확률과 백분위를 붙인 뒤,
//!
//! - 확률이 허용 임계값 이하인 finding은 리포트에서 제거하고
//! - 남은 finding 중 확률이 거부 임계값 이상인 것이 있으면 실패합니다.
//!
//! 제거는 리포트를 변경하므로 정책 평가 전에 한 번만 수행해야 합니다.
//! 점수가 없는 finding은 확률 0으로 비교하고, `unscored`에 따로 기록합니다.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reportgate_core::metrics as m;
use reportgate_formats::{GrypeConfig, GrypeReport};

use crate::error::PolicyError;

const FEED: &str = "epss";

/// EPSS CSV 헤더
pub const CSV_HEADER: [&str; 3] = ["cve", "epss", "percentile"];

/// CVE 하나의 점수
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpssRecord {
    pub probability: f64,
    pub percentile: f64,
}

/// 점수 공급원
///
/// 로컬 파일 테이블이 기본 구현입니다. 공급원에 접근할 수 없으면
/// [`PolicyError::Feed`]를 반환해야 하며, 빈 결과로 대신해서는 안 됩니다.
pub trait EpssSource: Send + Sync {
    /// 주어진 ID들의 점수를 조회합니다. 점수가 없는 ID는 결과에서 빠집니다.
    fn lookup(&self, ids: &[&str]) -> Result<HashMap<String, EpssRecord>, PolicyError>;
}

#[derive(Deserialize)]
struct EpssRow {
    cve: String,
    epss: f64,
    percentile: f64,
}

/// 로컬 EPSS CSV 테이블
///
/// 첫 줄은 `#model_version:...,score_date:...` 주석이고 그다음이
/// `cve,epss,percentile` 헤더입니다.
#[derive(Debug, Clone, Default)]
pub struct EpssTable {
    model_version: Option<String>,
    score_date: Option<String>,
    records: HashMap<String, EpssRecord>,
}

impl EpssTable {
    pub fn parse(raw: &[u8]) -> Result<Self, PolicyError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| PolicyError::feed(FEED, format!("feed is not UTF-8: {e}")))?;

        let (comment, body) = match text.split_once('\n') {
            Some((first, rest)) if first.starts_with('#') => (Some(first), rest),
            _ if text.starts_with('#') => (Some(text), ""),
            _ => (None, text),
        };

        let mut table = Self::default();
        if let Some(comment) = comment {
            for pair in comment.trim_start_matches('#').trim().split(',') {
                match pair.split_once(':') {
                    Some(("model_version", v)) => table.model_version = Some(v.trim().to_owned()),
                    Some(("score_date", v)) => table.score_date = Some(v.trim().to_owned()),
                    _ => {}
                }
            }
        }

        let mut rdr = csv::Reader::from_reader(body.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| PolicyError::feed(FEED, format!("failed to read CSV header: {e}")))?;
        if headers.iter().ne(CSV_HEADER.iter().copied()) {
            return Err(PolicyError::feed(
                FEED,
                format!(
                    "invalid CSV header: expected '{}', got '{}'",
                    CSV_HEADER.join(","),
                    headers.iter().collect::<Vec<_>>().join(",")
                ),
            ));
        }

        for (index, row) in rdr.deserialize::<EpssRow>().enumerate() {
            let row = row.map_err(|e| {
                PolicyError::feed(FEED, format!("invalid CSV row {}: {e}", index + 1))
            })?;
            if !(0.0..=1.0).contains(&row.epss) || !(0.0..=1.0).contains(&row.percentile) {
                return Err(PolicyError::feed(
                    FEED,
                    format!("score out of range for {}", row.cve),
                ));
            }
            table.records.insert(
                row.cve.to_ascii_uppercase(),
                EpssRecord {
                    probability: row.epss,
                    percentile: row.percentile,
                },
            );
        }
        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::parse(&raw)?;
        info!(
            path = %path.display(),
            model_version = table.model_version.as_deref().unwrap_or("unknown"),
            score_date = table.score_date.as_deref().unwrap_or("unknown"),
            count = table.len(),
            "EPSS scores loaded"
        );
        Ok(table)
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_version.as_deref()
    }

    pub fn score_date(&self) -> Option<&str> {
        self.score_date.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<EpssRecord> {
        self.records.get(&id.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EpssSource for EpssTable {
    fn lookup(&self, ids: &[&str]) -> Result<HashMap<String, EpssRecord>, PolicyError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.get(id).map(|record| ((*id).to_owned(), record)))
            .collect())
    }
}

/// 점수가 붙은 finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpssScore {
    pub id: String,
    pub severity: String,
    pub probability: Option<f64>,
    pub percentile: Option<f64>,
    pub link: String,
}

/// 리포트의 모든 finding에 점수를 붙입니다.
pub fn score_report(
    report: &GrypeReport,
    source: &dyn EpssSource,
) -> Result<Vec<EpssScore>, PolicyError> {
    let ids = report.vulnerability_ids();
    let records = source.lookup(&ids)?;
    Ok(report
        .matches
        .iter()
        .map(|m| {
            let record = records.get(&m.vulnerability.id);
            EpssScore {
                id: m.vulnerability.id.clone(),
                severity: m.vulnerability.severity.clone(),
                probability: record.map(|r| r.probability),
                percentile: record.map(|r| r.percentile),
                link: m.vulnerability.data_source.clone(),
            }
        })
        .collect())
}

/// EPSS 적용 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct EpssOutcome {
    pub scores: Vec<EpssScore>,
    /// 허용 임계값 이하로 리포트에서 제거된 ID
    pub removed: Vec<String>,
    /// 거부 임계값 이상인 ID
    pub denied: Vec<String>,
    /// 점수가 없는 ID
    pub unscored: Vec<String>,
    pub deny_threshold: f64,
}

impl EpssOutcome {
    /// 거부된 finding이 있으면 [`PolicyError::EpssDenied`]입니다.
    pub fn check(&self) -> Result<(), PolicyError> {
        if self.denied.is_empty() {
            return Ok(());
        }
        Err(PolicyError::EpssDenied {
            count: self.denied.len(),
            threshold: self.deny_threshold,
        })
    }
}

/// 점수를 붙이고 허용 임계값 이하 finding을 리포트에서 제거합니다.
pub fn apply(
    report: &mut GrypeReport,
    config: &GrypeConfig,
    source: &dyn EpssSource,
) -> Result<EpssOutcome, PolicyError> {
    let mut outcome = EpssOutcome {
        deny_threshold: config.epss_deny_threshold,
        ..EpssOutcome::default()
    };
    if report.matches.is_empty() {
        return Ok(outcome);
    }

    let scores = score_report(report, source)?;
    let mut probabilities: HashMap<&str, f64> = HashMap::new();
    let mut seen = HashSet::new();
    for score in &scores {
        if score.probability.is_none() && seen.insert(score.id.as_str()) {
            outcome.unscored.push(score.id.clone());
        }
        probabilities.insert(score.id.as_str(), score.probability.unwrap_or(0.0));
    }
    let probability = |id: &str| probabilities.get(id).copied().unwrap_or(0.0);

    let removed = report.remove_matches(|m| {
        probability(m.vulnerability.id.as_str()) <= config.epss_allow_threshold
    });
    outcome.removed = removed.into_iter().map(|m| m.vulnerability.id).collect();

    let mut seen = HashSet::new();
    for m in &report.matches {
        let id = m.vulnerability.id.as_str();
        if seen.insert(id) && probability(id) >= config.epss_deny_threshold {
            outcome.denied.push(id.to_owned());
        }
    }

    info!(
        count = outcome.removed.len(),
        ids = %outcome.removed.join(", "),
        "EPSS approved vulnerabilities"
    );
    info!(
        count = outcome.denied.len(),
        ids = %outcome.denied.join(", "),
        "EPSS denied vulnerabilities"
    );
    if !outcome.unscored.is_empty() {
        warn!(
            count = outcome.unscored.len(),
            ids = %outcome.unscored.join(", "),
            "vulnerabilities without EPSS score"
        );
    }

    metrics::counter!(m::ENRICH_REMOVED_TOTAL).increment(outcome.removed.len() as u64);
    metrics::counter!(m::ENRICH_FLAGGED_TOTAL, m::LABEL_FEED => FEED)
        .increment(outcome.denied.len() as u64);

    outcome.scores = scores;
    Ok(outcome)
}
