//! CISA KEV(Known Exploited Vulnerabilities) 카탈로그 매칭
//!
//! 카탈로그는 JSON 또는 9열 CSV로 로드하며, 파일 확장자가 아니라 내용으로
//! 형식을 판별합니다. 카탈로그에 포함된 취약점이 하나라도 리포트에 있으면
//! 심각도 임계값과 무관하게 검증 실패입니다.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reportgate_core::metrics as m;
use reportgate_formats::GrypeReport;

use crate::error::PolicyError;

const FEED: &str = "kev";

/// CSV 카탈로그 제목
pub const CSV_CATALOG_TITLE: &str = "CISA KEV Catalog from local CSV File";

/// CSV 카탈로그에는 버전 정보가 없습니다.
pub const CSV_CATALOG_VERSION: &str = "N/A";

/// CSV 카탈로그 헤더
pub const CSV_HEADER: [&str; 9] = [
    "cveID",
    "vendorProject",
    "product",
    "vulnerabilityName",
    "dateAdded",
    "shortDescription",
    "requiredAction",
    "dueDate",
    "notes",
];

/// CVE 레코드 링크 접두어
pub const CVE_RECORD_URL: &str = "https://www.cve.org/CVERecord?id=";

/// KEV 카탈로그
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KevCatalog {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub catalog_version: String,
    #[serde(default)]
    pub date_released: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub vulnerabilities: Vec<KevVulnerability>,
}

/// 카탈로그 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KevVulnerability {
    #[serde(rename = "cveID")]
    pub cve_id: String,
    #[serde(default)]
    pub vendor_project: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub vulnerability_name: String,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub required_action: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub notes: String,
}

impl KevCatalog {
    /// 내용을 보고 JSON 또는 CSV로 파싱합니다.
    pub fn parse(raw: &[u8]) -> Result<Self, PolicyError> {
        let first = raw.iter().find(|b| !b.is_ascii_whitespace());
        match first {
            Some(b'{') => Self::from_json(raw),
            Some(_) => Self::from_csv(raw),
            None => Err(PolicyError::feed(FEED, "catalog is empty")),
        }
    }

    /// JSON 카탈로그를 파싱하고 필수 필드를 검사합니다.
    pub fn from_json(raw: &[u8]) -> Result<Self, PolicyError> {
        let catalog: KevCatalog = serde_json::from_slice(raw)
            .map_err(|e| PolicyError::feed(FEED, format!("invalid JSON catalog: {e}")))?;

        if catalog.title.is_empty() {
            return Err(PolicyError::feed(FEED, "missing title"));
        }
        if catalog.catalog_version.is_empty() {
            return Err(PolicyError::feed(FEED, "missing catalog version"));
        }
        if catalog.vulnerabilities.is_empty() {
            return Err(PolicyError::feed(FEED, "catalog has no vulnerabilities"));
        }
        Ok(catalog)
    }

    /// 인용 부호가 있는 9열 CSV 카탈로그를 파싱합니다.
    pub fn from_csv(raw: &[u8]) -> Result<Self, PolicyError> {
        let mut rdr = csv::Reader::from_reader(raw);

        let headers = rdr
            .headers()
            .map_err(|e| PolicyError::feed(FEED, format!("failed to read CSV header: {e}")))?;
        if headers.len() != CSV_HEADER.len() {
            return Err(PolicyError::feed(
                FEED,
                format!(
                    "invalid CSV header: expected {} columns, got {}",
                    CSV_HEADER.len(),
                    headers.len()
                ),
            ));
        }
        if let Some((expected, found)) = CSV_HEADER
            .iter()
            .zip(headers.iter())
            .find(|(expected, found)| *expected != found)
        {
            return Err(PolicyError::feed(
                FEED,
                format!("invalid CSV header: expected column '{expected}', got '{found}'"),
            ));
        }

        let mut vulnerabilities = Vec::new();
        for (index, row) in rdr.deserialize::<KevVulnerability>().enumerate() {
            let vulnerability = row.map_err(|e| {
                PolicyError::feed(FEED, format!("invalid CSV row {}: {e}", index + 2))
            })?;
            vulnerabilities.push(vulnerability);
        }

        debug!(count = vulnerabilities.len(), "KEV CSV catalog decoded");

        Ok(Self {
            title: CSV_CATALOG_TITLE.to_owned(),
            catalog_version: CSV_CATALOG_VERSION.to_owned(),
            date_released: String::new(),
            count: vulnerabilities.len(),
            vulnerabilities,
        })
    }

    /// 로컬 파일에서 카탈로그를 로드합니다.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::parse(&raw)?;
        info!(
            path = %path.display(),
            version = %catalog.catalog_version,
            count = catalog.vulnerabilities.len(),
            "KEV catalog loaded"
        );
        Ok(catalog)
    }

    /// 리포트 finding 중 카탈로그에 있는 것을 찾습니다 (대소문자 무시).
    pub fn matches(&self, report: &GrypeReport) -> KevReport {
        let index: HashMap<String, &KevVulnerability> = self
            .vulnerabilities
            .iter()
            .map(|v| (v.cve_id.to_ascii_uppercase(), v))
            .collect();

        let matches: Vec<KevMatch> = report
            .matches
            .iter()
            .filter_map(|m| index.get(&m.vulnerability.id.to_ascii_uppercase()))
            .map(|v| KevMatch {
                id: v.cve_id.clone(),
                date_added: v.date_added.clone(),
                vulnerability_name: v.vulnerability_name.clone(),
                link: format!("{CVE_RECORD_URL}{}", v.cve_id),
            })
            .collect();

        if !matches.is_empty() {
            let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
            warn!(
                catalog_version = %self.catalog_version,
                ids = %ids.join(", "),
                "vulnerabilities matched to KEV catalog"
            );
            metrics::counter!(m::ENRICH_FLAGGED_TOTAL, m::LABEL_FEED => FEED)
                .increment(matches.len() as u64);
        }

        KevReport {
            catalog_version: self.catalog_version.clone(),
            matches,
        }
    }
}

/// 카탈로그에 매칭된 finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KevMatch {
    pub id: String,
    pub date_added: String,
    pub vulnerability_name: String,
    pub link: String,
}

/// 매칭 결과
#[derive(Debug, Clone, Serialize)]
pub struct KevReport {
    pub catalog_version: String,
    pub matches: Vec<KevMatch>,
}

impl KevReport {
    /// 매칭이 있으면 [`PolicyError::KevMatched`]입니다.
    pub fn check(&self) -> Result<(), PolicyError> {
        if self.matches.is_empty() {
            return Ok(());
        }
        Err(PolicyError::KevMatched {
            count: self.matches.len(),
            catalog_version: self.catalog_version.clone(),
        })
    }
}

impl fmt::Display for KevReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CISA KEV Catalog Vulnerabilities Report")?;
        writeln!(f, "Catalog Version: {}", self.catalog_version)?;
        if self.matches.is_empty() {
            return writeln!(f, "0 Vulnerabilities Matched to Catalog");
        }
        writeln!(
            f,
            "{:<20} {:<12} {:<52} Vulnerability Name",
            "CVE ID", "Date Added", "CVE.org Link"
        )?;
        writeln!(f, "{}", "-".repeat(110))?;
        for m in &self.matches {
            writeln!(
                f,
                "{:<20} {:<12} {:<52} {}",
                m.id, m.date_added, m.link, m.vulnerability_name
            )?;
        }
        Ok(())
    }
}
