//! `reportgate config` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use reportgate_core::config::GateConfig;
use reportgate_formats::PolicyConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Init { output, force } => execute_init(output, force, writer).await,
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Write the default policy template (every ceiling -1) to a file or stdout.
///
/// # Errors
///
/// Returns `CliError::Command` if the output file exists and `force` is not set.
async fn execute_init(
    output: Option<PathBuf>,
    force: bool,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let yaml = PolicyConfig::default().to_yaml()?;

    let Some(path) = output else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(yaml.as_bytes())?;
        return Ok(());
    };

    if !force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(CliError::Command(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    tokio::fs::write(&path, yaml.as_bytes()).await?;
    info!(path = %path.display(), "policy template written");

    writer.render(&PolicyInitReport {
        path: path.display().to_string(),
    })
}

/// Execute the config validate subcommand.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (missing file, invalid values, parse errors).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match GateConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Displays the effective configuration (file + env overrides + defaults).
/// A missing file shows the defaults.
///
/// # Errors
///
/// Returns `CliError::Gate` if loading fails or `CliError::Command` if section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = GateConfig::load_or_default(config_path).await?;
    let source = config_path.display().to_string();

    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(&config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("detect") => toml::to_string_pretty(&config.detect),
        Some("bundle") => toml::to_string_pretty(&config.bundle),
        Some("feeds") => toml::to_string_pretty(&config.feeds),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, detect, bundle, feeds)"
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {e})"));

    writer.render(&ConfigReport {
        source,
        section,
        config_toml,
    })
}

/// Policy template write result.
#[derive(Serialize)]
pub struct PolicyInitReport {
    pub path: String,
}

impl Render for PolicyInitReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Policy template written: {}", self.path.bold())
    }
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
