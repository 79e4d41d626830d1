//! 번들 요약 -- 산출물별 종류, 다이제스트, 크기, 필수 여부
//!
//! 리포팅 전용입니다. 요약을 만들어도 번들은 변경되지 않습니다.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use reportgate_core::types::{Digest, ReportKind};

use super::Bundle;
use crate::artifact::{Artifact, human_size};
use crate::detector::FormatDetector;
use crate::error::FormatError;

/// 번들 요약
#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
    pub version: String,
    pub entries: Vec<SummaryEntry>,
    pub total_size: u64,
}

/// 요약 행
#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub kind: ReportKind,
    pub label: String,
    pub digest: Digest,
    pub size: u64,
    pub required: bool,
}

impl Bundle {
    /// 각 산출물을 분류하여 요약을 만듭니다.
    ///
    /// `required`에 포함된 종류의 산출물은 필수로 표시됩니다.
    pub async fn summarize(
        &self,
        detector: &FormatDetector,
        timeout: Duration,
        required: &[ReportKind],
    ) -> Result<BundleSummary, FormatError> {
        let mut entries = Vec::with_capacity(self.len());
        for (label, content) in self.iter() {
            let artifact = Artifact::new(label, content.clone(), detector, timeout).await?;
            entries.push(SummaryEntry {
                kind: artifact.kind(),
                label: artifact.label().to_owned(),
                digest: *artifact.digest(),
                size: artifact.size(),
                required: required.contains(&artifact.kind()),
            });
        }

        Ok(BundleSummary {
            version: self.version().to_owned(),
            entries,
            total_size: self.total_size(),
        })
    }
}

impl fmt::Display for BundleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:<24} {:<16} {:>10}  Required",
            "Type", "Label", "Digest", "Size"
        )?;
        writeln!(f, "{}", "-".repeat(90))?;
        for entry in &self.entries {
            // 다이제스트는 앞 12자리만 표시
            let digest = entry.digest.to_string();
            let short = digest.get(..19).unwrap_or(&digest);
            writeln!(
                f,
                "{:<28} {:<24} {:<16} {:>10}  {}",
                entry.kind.display_name(),
                entry.label,
                short,
                human_size(entry.size),
                if entry.required { "yes" } else { "" }
            )?;
        }
        writeln!(f, "{}", "-".repeat(90))?;
        write!(f, "Total Size: {}", human_size(self.total_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn summary_marks_required_kinds() {
        let mut bundle = Bundle::new();
        bundle.add("gitleaks.json", Bytes::from_static(b"[]"));
        bundle.add("notes.txt", Bytes::from_static(b"hello"));

        let detector = FormatDetector::with_defaults();
        let summary = bundle
            .summarize(&detector, Duration::from_secs(5), &[ReportKind::SecretScan])
            .await
            .unwrap();

        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.entries[0].kind, ReportKind::SecretScan);
        assert!(summary.entries[0].required);
        assert_eq!(summary.entries[1].kind, ReportKind::Generic);
        assert!(!summary.entries[1].required);
        assert_eq!(summary.total_size, 7);

        let table = summary.to_string();
        assert!(table.contains("Gitleaks Scan Report"));
        assert!(table.contains("Total Size: 7 B"));
    }
}
