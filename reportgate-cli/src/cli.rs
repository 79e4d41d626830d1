//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Reportgate -- security scan report gatekeeper.
///
/// Use `reportgate <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "reportgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to the reportgate.toml configuration file.
    #[arg(short, long, default_value = "reportgate.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a report or bundle against a policy file.
    Validate(ValidateArgs),

    /// Create and manage report bundles.
    Bundle(BundleArgs),

    /// Detect and print one or more reports.
    Print(PrintArgs),

    /// Score the findings of a vulnerability report with EPSS.
    Epss(EpssArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- validate ----

/// Validate a report or bundle against a policy file.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Report or bundle file to validate.
    pub target: PathBuf,

    /// Policy YAML file.
    #[arg(short, long)]
    pub policy: PathBuf,

    /// Local KEV catalog (JSON or CSV). Overrides `feeds.kev_file`.
    #[arg(long)]
    pub kev_file: Option<PathBuf>,

    /// Local EPSS score file (CSV). Overrides `feeds.epss_file`.
    #[arg(long)]
    pub epss_file: Option<PathBuf>,

    /// Report validation failures without failing the command.
    #[arg(long)]
    pub audit: bool,
}

// ---- bundle ----

/// Create and manage report bundles.
#[derive(Args, Debug)]
pub struct BundleArgs {
    #[command(subcommand)]
    pub action: BundleAction,
}

#[derive(Subcommand, Debug)]
pub enum BundleAction {
    /// Create a new bundle from files (label = file name).
    Create {
        /// Files to bundle.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output bundle path (default: `bundle.default_filename`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip input files that do not exist instead of failing.
        #[arg(long)]
        allow_missing: bool,
    },
    /// Add files to an existing bundle, replacing same-named labels.
    Add {
        /// Existing bundle file.
        bundle: PathBuf,

        /// Files to add.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip input files that do not exist instead of failing.
        #[arg(long)]
        allow_missing: bool,
    },
    /// Summarize the artifacts in a bundle.
    List {
        /// Bundle file.
        bundle: PathBuf,

        /// Policy YAML file used to mark required report types.
        #[arg(short, long)]
        policy: Option<PathBuf>,
    },
    /// Write one artifact's payload to a file or stdout.
    Extract {
        /// Bundle file.
        bundle: PathBuf,

        /// Artifact label.
        label: String,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove an artifact from a bundle.
    Remove {
        /// Bundle file.
        bundle: PathBuf,

        /// Artifact label.
        label: String,
    },
}

// ---- print ----

/// Detect and print one or more reports.
#[derive(Args, Debug)]
pub struct PrintArgs {
    /// Files to print.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

// ---- epss ----

/// Score the findings of a vulnerability report with EPSS.
#[derive(Args, Debug)]
pub struct EpssArgs {
    /// Grype report file.
    pub report: PathBuf,

    /// Local EPSS score file (CSV). Overrides `feeds.epss_file`.
    #[arg(long)]
    pub epss_file: Option<PathBuf>,
}

// ---- config ----

/// Manage reportgate configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a policy file template with every ceiling set to -1.
    Init {
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing output file.
        #[arg(long)]
        force: bool,
    },
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, detect, bundle, feeds).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_validate_defaults() {
        let cli = Cli::try_parse_from(["reportgate", "validate", "grype.json", "-p", "policy.yaml"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.target, PathBuf::from("grype.json"));
                assert_eq!(args.policy, PathBuf::from("policy.yaml"));
                assert!(args.kev_file.is_none());
                assert!(args.epss_file.is_none());
                assert!(!args.audit, "audit should default to false");
            }
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_with_feeds_and_audit() {
        let cli = Cli::try_parse_from([
            "reportgate",
            "validate",
            "bundle.gz",
            "--policy",
            "policy.yaml",
            "--kev-file",
            "kev.csv",
            "--epss-file",
            "epss.csv",
            "--audit",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.kev_file, Some(PathBuf::from("kev.csv")));
                assert_eq!(args.epss_file, Some(PathBuf::from("epss.csv")));
                assert!(args.audit);
            }
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_requires_policy() {
        let args = Cli::try_parse_from(["reportgate", "validate", "grype.json"]);
        assert!(args.is_err(), "policy flag is required");
    }

    #[test]
    fn test_cli_parse_bundle_create() {
        let cli = Cli::try_parse_from([
            "reportgate",
            "bundle",
            "create",
            "grype.json",
            "semgrep.json",
            "-o",
            "out.gz",
            "--allow-missing",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Bundle(BundleArgs {
                action:
                    BundleAction::Create {
                        files,
                        output,
                        allow_missing,
                    },
            }) => {
                assert_eq!(files.len(), 2);
                assert_eq!(output, Some(PathBuf::from("out.gz")));
                assert!(allow_missing);
            }
            _ => panic!("expected Bundle Create"),
        }
    }

    #[test]
    fn test_cli_parse_bundle_create_requires_files() {
        let args = Cli::try_parse_from(["reportgate", "bundle", "create"]);
        assert!(args.is_err(), "at least one file is required");
    }

    #[test]
    fn test_cli_parse_bundle_extract() {
        let cli = Cli::try_parse_from(["reportgate", "bundle", "extract", "b.gz", "grype.json"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Bundle(BundleArgs {
                action:
                    BundleAction::Extract {
                        bundle,
                        label,
                        output,
                    },
            }) => {
                assert_eq!(bundle, PathBuf::from("b.gz"));
                assert_eq!(label, "grype.json");
                assert!(output.is_none());
            }
            _ => panic!("expected Bundle Extract"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["reportgate", "config", "init", "-o", "policy.yaml"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            }) => {
                assert_eq!(output, Some(PathBuf::from("policy.yaml")));
                assert!(!force);
            }
            _ => panic!("expected Config Init"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "reportgate",
            "-c",
            "/etc/reportgate.toml",
            "print",
            "grype.json",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/reportgate.toml"));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["reportgate"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "reportgate");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in ["validate", "bundle", "print", "epss", "config"] {
            assert!(
                subcommands.contains(&expected),
                "should have '{expected}' subcommand"
            );
        }
    }
}
