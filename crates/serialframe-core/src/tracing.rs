//! Log output for serialframe binaries.
//!
//! Library crates only emit events. A binary installs the subscriber once:
//!
//! ```ignore
//! use serialframe_core::{LogFormat, TracingConfig, init_tracing};
//!
//! init_tracing(TracingConfig::for_verbosity(1).with_format(LogFormat::Json))?;
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt as tfmt, prelude::*};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),

    /// The explicit filter directive does not parse.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// Unknown `--log-format` value.
    #[error("invalid log format: {0} (expected text, compact or json)")]
    UnknownFormat(String),
}

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    Text,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(TracingError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for serialframe crates when `RUST_LOG` is unset.
    pub level: Level,
    pub format: LogFormat,
    /// Adds file and line to every event.
    pub location: bool,
    /// Explicit filter, takes precedence over `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_verbosity(0)
    }
}

impl TracingConfig {
    /// Settings for a `-v` count: warnings only, then debug, then trace.
    /// Any verbosity adds source locations.
    #[must_use]
    pub fn for_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            format: LogFormat::default(),
            location: verbosity > 0,
            directive: None,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref directive) = self.directive {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("warn,serialframe={}", self.level))))
    }
}

/// Installs the global subscriber, writing to stderr.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the explicit directive
/// is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let base = tfmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.location)
        .with_line_number(config.location);

    let layer = match config.format {
        LogFormat::Text => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Json => base.json().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        let config = TracingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.location);
    }

    #[test]
    fn verbosity_raises_level() {
        let debug = TracingConfig::for_verbosity(1);
        assert_eq!(debug.level, Level::DEBUG);
        assert!(debug.location);
        assert_eq!(TracingConfig::for_verbosity(4).level, Level::TRACE);
    }

    #[test]
    fn parses_formats() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::Compact.to_string().parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TracingError::UnknownFormat(ref s)) if s == "xml"
        ));
    }

    #[test]
    fn explicit_directive_must_parse() {
        let config = TracingConfig::default().with_directive("serialframe_port=loud");
        assert!(matches!(config.filter(), Err(TracingError::Filter(_))));

        let config = TracingConfig::default().with_directive("serialframe_port=trace");
        assert!(config.filter().is_ok());
    }
}
