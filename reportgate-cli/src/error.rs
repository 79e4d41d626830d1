//! CLI-specific error types and exit code mapping

use reportgate_core::error::{ErrorKind, GateError};
use reportgate_formats::FormatError;
use reportgate_policy::PolicyError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration validation failure reported by `config validate`.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid or missing user input (flags, arguments, output paths).
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, output file, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error.
    #[error("{0}")]
    Gate(#[from] GateError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success (or audit mode)                   |
    /// | 1    | Validation failure                        |
    /// | 2    | File access error                         |
    /// | -1   | Anything else (process exit status 255)   |
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            Some(ErrorKind::Validation) => 1,
            Some(ErrorKind::FileAccess) => 2,
            _ => -1,
        }
    }

    /// Error classification, when the error came from a domain crate.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Gate(e) => Some(e.kind()),
            Self::Io(_) => Some(ErrorKind::FileAccess),
            Self::Command(_) => Some(ErrorKind::UserInput),
            Self::Config(_) | Self::JsonSerialize(_) => None,
        }
    }
}

impl From<FormatError> for CliError {
    fn from(e: FormatError) -> Self {
        Self::Gate(e.into())
    }
}

impl From<PolicyError> for CliError {
    fn from(e: PolicyError) -> Self {
        Self::Gate(e.into())
    }
}
