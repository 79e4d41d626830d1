//! `reportgate validate` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use reportgate_core::config::GateConfig;
use reportgate_core::error::ErrorKind;
use reportgate_formats::{FormatDetector, PolicyConfig};
use reportgate_policy::{
    EpssTable, KevCatalog, PolicyError, ReportOutcome, ReportValidator, ValidationOutcome,
};

use super::{feed_path, read_input};
use crate::cli::ValidateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// Loads the policy and optional local feeds, detects the target and
/// evaluates it. Policy failures are rendered before being returned; in
/// audit mode they are rendered and the command succeeds.
///
/// # Errors
///
/// - `FileAccess` when the target, policy or a feed file cannot be read
/// - `Encoding` when the target or policy cannot be decoded
/// - `Validation` on policy failure (unless `--audit`)
/// - `Api` when a feed file is malformed
pub async fn execute(
    args: ValidateArgs,
    config: &GateConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(
        target = %args.target.display(),
        policy = %args.policy.display(),
        audit = args.audit,
        "validating"
    );

    let raw_policy = read_input(&args.policy).await?;
    let policy = PolicyConfig::from_yaml(&raw_policy)?;

    let mut validator = ReportValidator::new(
        FormatDetector::from_config(&config.bundle),
        config.detect.timeout(),
    );
    if let Some(path) = feed_path(args.kev_file, config.feeds.kev_file.as_ref()) {
        validator = validator.with_kev(KevCatalog::from_file(&path)?);
    }
    if let Some(path) = feed_path(args.epss_file, config.feeds.epss_file.as_ref()) {
        validator = validator.with_epss(Arc::new(EpssTable::from_file(&path)?));
    }

    let content = read_input(&args.target).await?;
    let target = args.target.display().to_string();

    match validator.validate(content, &policy).await {
        Ok(outcome) => {
            let report = ValidationReport {
                target,
                passed: true,
                audit: args.audit,
                outcome: Some(outcome),
                failures: Vec::new(),
            };
            writer.render(&report)?;
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::Validation => {
            let report = ValidationReport {
                target,
                passed: false,
                audit: args.audit,
                outcome: None,
                failures: failure_lines(&e),
            };
            writer.render(&report)?;
            if args.audit {
                warn!(failures = report.failures.len(), "audit mode: validation failure ignored");
                return Ok(());
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Flatten a policy failure into one line per cause, bundle failures prefixed by label.
pub fn failure_lines(err: &PolicyError) -> Vec<String> {
    match err {
        PolicyError::BundleViolations(failures) => failures
            .iter()
            .flat_map(|(label, e)| {
                failure_lines(e)
                    .into_iter()
                    .map(move |line| format!("{label}: {line}"))
            })
            .collect(),
        PolicyError::Combined(errors) => errors.iter().flat_map(failure_lines).collect(),
        other => vec![other.to_string()],
    }
}

/// Validation result payload.
#[derive(Serialize)]
pub struct ValidationReport {
    pub target: String,
    pub passed: bool,
    pub audit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ValidationOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Validation: {}", self.target.bold())?;
        if self.passed {
            writeln!(w, "  Result: {}", "PASS".green().bold())?;
        } else if self.audit {
            writeln!(w, "  Result: {} {}", "FAIL".red().bold(), "(audit)".yellow())?;
        } else {
            writeln!(w, "  Result: {}", "FAIL".red().bold())?;
        }

        for line in &self.failures {
            writeln!(w, "  {} {}", "-".red(), line)?;
        }

        match &self.outcome {
            Some(ValidationOutcome::Report(report)) => {
                writeln!(w)?;
                render_report(w, None, report)?;
            }
            Some(ValidationOutcome::Bundle(bundle)) => {
                for (label, report) in &bundle.reports {
                    writeln!(w)?;
                    render_report(w, Some(label), report)?;
                }
                if !bundle.skipped.is_empty() {
                    writeln!(w)?;
                    writeln!(w, "Skipped: {}", bundle.skipped.join(", ").dimmed())?;
                }
            }
            None => {}
        }

        Ok(())
    }
}

fn render_report(
    w: &mut dyn Write,
    label: Option<&String>,
    report: &ReportOutcome,
) -> std::io::Result<()> {
    use colored::Colorize;

    match label {
        Some(label) => writeln!(w, "[{}] {}", label.bold(), report.kind.display_name())?,
        None => writeln!(w, "{}", report.kind.display_name().bold())?,
    }

    writeln!(w, "  {:<18} {:>8} {:>10}", "Level", "Found", "Allowed")?;
    writeln!(w, "  {}", "-".repeat(38))?;
    for count in &report.verdict.counts {
        let ceiling = if count.ceiling < 0 {
            "unlimited".to_owned()
        } else {
            count.ceiling.to_string()
        };
        writeln!(w, "  {:<18} {:>8} {:>10}", count.level, count.found, ceiling)?;
    }
    for (level, found) in &report.verdict.uncategorized {
        writeln!(w, "  {:<18} {:>8} {:>10}", level.dimmed(), found, "-")?;
    }

    for listed in &report.verdict.allowed {
        writeln!(w, "  allowed {} ({}): {}", listed.id, listed.level, listed.reason)?;
    }

    if let Some(kev) = &report.kev {
        writeln!(w)?;
        writeln!(w, "{kev}")?;
    }
    if let Some(epss) = &report.epss {
        writeln!(
            w,
            "  EPSS: {} removed, {} unscored",
            epss.removed.len(),
            epss.unscored.len()
        )?;
    }

    Ok(())
}
