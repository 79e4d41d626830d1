//! Command handlers -- one module per subcommand

pub mod bundle;
pub mod config;
pub mod epss;
pub mod print;
pub mod validate;

use std::path::{Path, PathBuf};

use bytes::Bytes;

use reportgate_core::config::GateConfig;
use reportgate_core::error::GateError;

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Dispatch a parsed command to its handler.
pub async fn run(
    command: Commands,
    config_path: &Path,
    config: &GateConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match command {
        Commands::Validate(args) => validate::execute(args, config, writer).await,
        Commands::Bundle(args) => bundle::execute(args, config, writer).await,
        Commands::Print(args) => print::execute(args, config, writer).await,
        Commands::Epss(args) => epss::execute(args, config, writer).await,
        Commands::Config(args) => config::execute(args, config_path, writer).await,
    }
}

/// Read an input file fully, mapping failures to `FileAccess`.
pub(crate) async fn read_input(path: &Path) -> Result<Bytes, GateError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| GateError::file_access(path.display(), e))
}

/// Pick the CLI flag when given, else the `[feeds]` config value.
pub(crate) fn feed_path(flag: Option<PathBuf>, configured: Option<&String>) -> Option<PathBuf> {
    flag.or_else(|| configured.map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_path_prefers_flag() {
        let configured = "/var/feeds/kev.json".to_owned();
        assert_eq!(
            feed_path(Some(PathBuf::from("kev.csv")), Some(&configured)),
            Some(PathBuf::from("kev.csv"))
        );
        assert_eq!(
            feed_path(None, Some(&configured)),
            Some(PathBuf::from("/var/feeds/kev.json"))
        );
        assert_eq!(feed_path(None, None), None);
    }

    #[tokio::test]
    async fn test_read_input_missing_file_is_file_access() {
        let err = read_input(Path::new("/nonexistent/reportgate/input.json"))
            .await
            .unwrap_err();
        assert_eq!(
            err.kind(),
            reportgate_core::error::ErrorKind::FileAccess,
            "missing input should be a file access error"
        );
    }
}
