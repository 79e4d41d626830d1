use clap::Parser;
use colored::Colorize;

use reportgate_cli::cli::Cli;
use reportgate_cli::commands;
use reportgate_cli::error::CliError;
use reportgate_cli::logging;
use reportgate_cli::output::OutputWriter;
use reportgate_core::config::GateConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match GateConfig::load_or_default(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            let e = CliError::from(e);
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    logging::init_tracing(&config.general)?;

    tracing::debug!(config = %cli.config.display(), "reportgate starting");

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = commands::run(cli.command, &cli.config, &config, &writer).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}
