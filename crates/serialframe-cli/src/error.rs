//! CLI error types.

use std::fmt;

use serialframe_core::{SettingsError, TracingError};
use serialframe_port::PortError;
use serialframe_protocol::FramingError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Invalid port setting or byte marker.
    Settings(SettingsError),
    /// Port, transport or receive loop failure.
    Port(PortError),
    /// Failure decoding a capture.
    Framing(FramingError),
    /// IO error.
    Io(std::io::Error),
    /// No device given on the command line or in the config file.
    NoDevice,
    /// Background task failed.
    Task(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Settings(err) => write!(f, "invalid setting: {}", err),
            Self::Port(err) => write!(f, "port error: {}", err),
            Self::Framing(err) => write!(f, "framing error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::NoDevice => write!(
                f,
                "no device given; pass --device or set [port] device in the config file"
            ),
            Self::Task(msg) => write!(f, "background task failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Settings(err) => Some(err),
            Self::Port(err) => Some(err),
            Self::Framing(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Settings(err)
    }
}

impl From<PortError> for CliError {
    fn from(err: PortError) -> Self {
        Self::Port(err)
    }
}

impl From<FramingError> for CliError {
    fn from(err: FramingError) -> Self {
        Self::Framing(err)
    }
}

impl From<TracingError> for CliError {
    fn from(err: TracingError) -> Self {
        Self::Config(format!("failed to initialise logging: {}", err))
    }
}

impl From<tokio::task::JoinError> for CliError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialframe_core::LogFormat;

    #[test]
    fn logging_setup_errors_are_config_errors() {
        let err = "xml".parse::<LogFormat>().unwrap_err();
        let cli: CliError = err.into();
        assert!(matches!(cli, CliError::Config(_)));
        assert_eq!(
            cli.to_string(),
            "configuration error: failed to initialise logging: \
             invalid log format: xml (expected text, compact or json)"
        );
    }

    #[test]
    fn missing_device_message() {
        assert!(CliError::NoDevice.to_string().contains("--device"));
    }
}
