//! `reportgate print` command handler

use std::io::Write;

use serde::Serialize;
use tracing::debug;

use reportgate_core::config::GateConfig;
use reportgate_core::types::ReportKind;
use reportgate_formats::{FormatDetector, Report, human_size};

use super::read_input;
use crate::cli::PrintArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `print` command.
///
/// Each file is classified; unrecognized content prints as `Generic`
/// with no findings.
pub async fn execute(
    args: PrintArgs,
    config: &GateConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let detector = FormatDetector::from_config(&config.bundle);
    let mut printed = Vec::with_capacity(args.files.len());

    for file in &args.files {
        let content = read_input(file).await?;
        let report = detector.classify(content, config.detect.timeout()).await?;
        debug!(path = %file.display(), kind = %report.kind(), "report classified");
        printed.push(PrintedReport::from_report(file.display().to_string(), &report));
    }

    writer.render(&PrintOutput { reports: printed })
}

/// All printed reports, in argument order.
#[derive(Serialize)]
pub struct PrintOutput {
    pub reports: Vec<PrintedReport>,
}

/// One decoded input and its findings.
#[derive(Serialize)]
pub struct PrintedReport {
    pub source: String,
    pub kind: ReportKind,
    pub rows: Vec<FindingRow>,
}

/// Finding table row, shared across report kinds.
#[derive(Debug, Serialize)]
pub struct FindingRow {
    pub id: String,
    pub severity: String,
    pub location: String,
    pub detail: String,
}

impl PrintedReport {
    pub fn from_report(source: String, report: &Report) -> Self {
        let rows = match report {
            Report::VulnScan(grype) => grype
                .matches
                .iter()
                .map(|m| FindingRow {
                    id: m.vulnerability.id.clone(),
                    severity: m.vulnerability.severity.clone(),
                    location: format!("{}@{}", m.artifact.name, m.artifact.version),
                    detail: m.vulnerability.data_source.clone(),
                })
                .collect(),
            Report::StaticScan(semgrep) => semgrep
                .findings()
                .iter()
                .map(|r| FindingRow {
                    id: r.check_id.clone(),
                    severity: r.extra.severity.clone(),
                    location: format!("{}:{}", r.path, r.start.line),
                    detail: r.extra.message.clone(),
                })
                .collect(),
            Report::SecretScan(gitleaks) => gitleaks
                .findings()
                .iter()
                .map(|f| FindingRow {
                    id: f.rule_id.clone(),
                    severity: "secret".to_owned(),
                    location: format!("{}:{}", f.file, f.start_line),
                    detail: f.description.clone(),
                })
                .collect(),
            Report::Sbom(sbom) => sbom
                .vulnerabilities()
                .iter()
                .map(|v| FindingRow {
                    id: v.id.clone(),
                    severity: v.severity(),
                    location: v
                        .affects
                        .iter()
                        .map(|a| a.reference.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    detail: v.description.clone().unwrap_or_default(),
                })
                .collect(),
            Report::Bundle(bundle) => bundle
                .iter()
                .map(|(label, content)| FindingRow {
                    id: label.to_owned(),
                    severity: String::new(),
                    location: human_size(content.len() as u64),
                    detail: String::new(),
                })
                .collect(),
            Report::PolicyConfig(_) | Report::Generic => Vec::new(),
        };

        Self {
            source,
            kind: report.kind(),
            rows,
        }
    }
}

impl Render for PrintOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (i, report) in self.reports.iter().enumerate() {
            if i > 0 {
                writeln!(w)?;
            }
            report.render_text(w)?;
        }
        Ok(())
    }
}

impl Render for PrintedReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{} ({})", self.source.bold(), self.kind.display_name())?;
        if self.rows.is_empty() {
            writeln!(w, "  No findings.")?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<28} {:<10} {:<36} Detail",
            "ID", "Severity", "Location"
        )?;
        writeln!(w, "{}", "-".repeat(100))?;
        for row in &self.rows {
            let severity = match row.severity.to_lowercase().as_str() {
                "critical" | "error" | "secret" => row.severity.red().bold(),
                "high" | "warning" => row.severity.red(),
                "medium" => row.severity.yellow(),
                _ => row.severity.normal(),
            };
            writeln!(
                w,
                "{:<28} {:<10} {:<36} {}",
                row.id, severity, row.location, row.detail
            )?;
        }
        writeln!(w, "{}", "-".repeat(100))?;
        writeln!(w, "Total: {}", self.rows.len())?;
        Ok(())
    }
}
