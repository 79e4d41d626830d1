//! `reportgate bundle` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use reportgate_core::config::GateConfig;
use reportgate_formats::{Bundle, BundleSummary, FormatDetector, PolicyConfig, human_size};

use super::read_input;
use crate::cli::{BundleAction, BundleArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `bundle` command.
pub async fn execute(
    args: BundleArgs,
    config: &GateConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let max = config.bundle.max_decompressed_bytes;
    match args.action {
        BundleAction::Create {
            files,
            output,
            allow_missing,
        } => {
            let path =
                output.unwrap_or_else(|| PathBuf::from(&config.bundle.default_filename));
            let mut bundle = Bundle::new();
            let added = add_files(&mut bundle, &files, allow_missing).await?;
            bundle.write_file(&path)?;
            info!(path = %path.display(), artifacts = bundle.len(), "bundle created");
            writer.render(&BundleChange::new("created", &path, &bundle, added))
        }
        BundleAction::Add {
            bundle: path,
            files,
            allow_missing,
        } => {
            let mut bundle = Bundle::read_file(&path, max)?;
            let added = add_files(&mut bundle, &files, allow_missing).await?;
            bundle.write_file(&path)?;
            info!(path = %path.display(), artifacts = bundle.len(), "bundle updated");
            writer.render(&BundleChange::new("updated", &path, &bundle, added))
        }
        BundleAction::List {
            bundle: path,
            policy,
        } => {
            let bundle = Bundle::read_file(&path, max)?;
            let required = match policy {
                Some(policy_path) => {
                    let raw = read_input(&policy_path).await?;
                    PolicyConfig::from_yaml(&raw)?.required_kinds()
                }
                None => Vec::new(),
            };
            let detector = FormatDetector::from_config(&config.bundle);
            let summary = bundle
                .summarize(&detector, config.detect.timeout(), &required)
                .await?;
            writer.render(&summary)
        }
        BundleAction::Extract {
            bundle: path,
            label,
            output,
        } => {
            let bundle = Bundle::read_file(&path, max)?;
            let content = bundle.extract(&label)?;
            match output {
                Some(out) => {
                    tokio::fs::write(&out, &content[..]).await?;
                    info!(label = %label, output = %out.display(), "artifact extracted");
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(content)?;
                    stdout.flush()?;
                }
            }
            Ok(())
        }
        BundleAction::Remove {
            bundle: path,
            label,
        } => {
            let mut bundle = Bundle::read_file(&path, max)?;
            bundle.remove(&label)?;
            bundle.write_file(&path)?;
            info!(path = %path.display(), label = %label, "artifact removed");
            writer.render(&BundleChange::new("updated", &path, &bundle, Vec::new()))
        }
    }
}

/// Add each file under its basename label. Missing files are skipped with a
/// warning when `allow_missing` is set.
async fn add_files(
    bundle: &mut Bundle,
    files: &[PathBuf],
    allow_missing: bool,
) -> Result<Vec<String>, CliError> {
    let mut added = Vec::with_capacity(files.len());
    for file in files {
        if allow_missing && !tokio::fs::try_exists(file).await.unwrap_or(false) {
            warn!(path = %file.display(), "input file missing, skipped");
            continue;
        }
        added.push(bundle.add_file(file)?);
    }
    Ok(added)
}

/// Result of a bundle write (create, add, remove).
#[derive(Serialize)]
pub struct BundleChange {
    pub action: &'static str,
    pub path: String,
    pub added: Vec<String>,
    pub labels: Vec<String>,
    pub total_size: u64,
}

impl BundleChange {
    fn new(action: &'static str, path: &Path, bundle: &Bundle, added: Vec<String>) -> Self {
        Self {
            action,
            path: path.display().to_string(),
            added,
            labels: bundle.labels().map(str::to_owned).collect(),
            total_size: bundle.total_size(),
        }
    }
}

impl Render for BundleChange {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Bundle {}: {}", self.action, self.path.bold())?;
        for label in &self.added {
            writeln!(w, "  {} {}", "+".green(), label)?;
        }
        writeln!(
            w,
            "  {} artifact(s), {}",
            self.labels.len(),
            human_size(self.total_size)
        )?;
        Ok(())
    }
}

impl Render for BundleSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_bundle_change_render_text() {
        let mut bundle = Bundle::new();
        bundle.add("grype.json", Bytes::from_static(b"{}"));
        let change = BundleChange::new(
            "created",
            Path::new("out.gz"),
            &bundle,
            vec!["grype.json".to_owned()],
        );

        let mut buffer = Vec::new();
        change
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Bundle created"));
        assert!(output.contains("out.gz"));
        assert!(output.contains("grype.json"));
        assert!(output.contains("1 artifact(s), 2 B"));
    }

    #[tokio::test]
    async fn test_add_files_allow_missing_skips() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let present = dir.path().join("notes.txt");
        std::fs::write(&present, "hello").expect("write input");
        let missing = dir.path().join("absent.json");

        let mut bundle = Bundle::new();
        let added = add_files(&mut bundle, &[present, missing.clone()], true)
            .await
            .expect("missing file should be skipped");
        assert_eq!(added, vec!["notes.txt".to_owned()]);
        assert_eq!(bundle.len(), 1);

        let err = add_files(&mut Bundle::new(), &[missing], false)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2, "missing input is a file access error");
    }
}
