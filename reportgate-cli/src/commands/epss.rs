//! `reportgate epss` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use reportgate_core::config::GateConfig;
use reportgate_formats::{FormatDetector, Report};
use reportgate_policy::epss::score_report;
use reportgate_policy::{EpssScore, EpssTable};

use super::{feed_path, read_input};
use crate::cli::EpssArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `epss` command.
///
/// # Errors
///
/// Returns `CliError::Command` when no EPSS file is configured or the
/// input is not a vulnerability scan.
pub async fn execute(
    args: EpssArgs,
    config: &GateConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let epss_path = feed_path(args.epss_file, config.feeds.epss_file.as_ref()).ok_or_else(|| {
        CliError::Command("no EPSS file given: pass --epss-file or set feeds.epss_file".to_owned())
    })?;
    let table = EpssTable::from_file(&epss_path)?;

    let content = read_input(&args.report).await?;
    let detector = FormatDetector::from_config(&config.bundle);
    let report = detector.detect(content, config.detect.timeout()).await?;
    let kind = report.kind();
    let Report::VulnScan(grype) = report else {
        return Err(CliError::Command(format!(
            "{} is a {}, expected a vulnerability scan",
            args.report.display(),
            kind.display_name()
        )));
    };

    let scores = score_report(&grype, &table)?;
    info!(
        findings = scores.len(),
        scored = scores.iter().filter(|s| s.probability.is_some()).count(),
        "EPSS scores listed"
    );

    writer.render(&EpssListing {
        model_version: table.model_version().map(str::to_owned),
        score_date: table.score_date().map(str::to_owned),
        scores,
    })
}

/// EPSS scores for every finding of a report.
#[derive(Serialize)]
pub struct EpssListing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_date: Option<String>,
    pub scores: Vec<EpssScore>,
}

impl Render for EpssListing {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(version) = &self.model_version {
            writeln!(
                w,
                "EPSS model {} ({})",
                version.bold(),
                self.score_date.as_deref().unwrap_or("unknown date")
            )?;
        }

        writeln!(
            w,
            "{:<18} {:<10} {:>12} {:>12}  Link",
            "CVE ID", "Severity", "Probability", "Percentile"
        )?;
        writeln!(w, "{}", "-".repeat(100))?;
        for score in &self.scores {
            writeln!(
                w,
                "{:<18} {:<10} {:>12} {:>12}  {}",
                score.id,
                score.severity,
                percent(score.probability),
                percent(score.percentile),
                score.link
            )?;
        }
        Ok(())
    }
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "-".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(Some(0.5)), "50.00%");
        assert_eq!(percent(Some(0.0)), "0.00%");
        assert_eq!(percent(None), "-");
    }

    #[test]
    fn test_epss_listing_render_unscored() {
        let listing = EpssListing {
            model_version: Some("v2023.03.01".to_owned()),
            score_date: Some("2023-10-16T00:00:00+0000".to_owned()),
            scores: vec![EpssScore {
                id: "CVE-2099-0001".to_owned(),
                severity: "High".to_owned(),
                probability: None,
                percentile: None,
                link: "https://nvd.nist.gov/vuln/detail/CVE-2099-0001".to_owned(),
            }],
        };

        let mut buffer = Vec::new();
        listing.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("v2023.03.01"));
        assert!(output.contains("CVE-2099-0001"));
        assert!(output.contains("Probability"));
    }
}
