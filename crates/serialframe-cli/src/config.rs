//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/serialframe/config.toml` by default:
//!
//! ```toml
//! [port]
//! device = "/dev/ttyUSB0"
//! baud_rate = 115200
//! parity = "none"
//! stop_bits = "1"
//!
//! [framing]
//! idle_timeout_ms = 5000
//! terminator = '\r\n'
//! leading = '\r\n'
//! boundary = '\r'
//! ```
//!
//! Byte markers use C-style escapes (`\r`, `\n`, `\xHH`). Single-quoted
//! TOML strings keep the backslashes as written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use serialframe_core::{PortSettings, parse_escaped};
use serialframe_port::{AtConfig, ReceiverConfig, SerialConnector};
use serialframe_protocol::{DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE, FramingConfig};

use crate::error::{CliError, CliResult};

/// Configuration for the serialframe CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Line settings of the device.
    pub port: PortSettings,

    /// Buffering and frame markers.
    pub framing: FramingSettings,
}

/// Buffering and frame marker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingSettings {
    /// Maximum number of buffered, not yet framed bytes.
    pub capacity: usize,

    /// Bytes requested per transport read.
    pub chunk_size: usize,

    /// Drop buffered bytes after this many milliseconds without data. 0 disables.
    pub idle_timeout_ms: u64,

    /// How long a single transport read may block.
    pub read_timeout_ms: u64,

    /// Appended to every line sent.
    pub terminator: String,

    /// Bytes stripped from the front of the buffer before looking for a boundary.
    pub leading: String,

    /// Marks the end of a received frame.
    pub boundary: String,
}

impl Default for FramingSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            idle_timeout_ms: 0,
            read_timeout_ms: 50,
            terminator: r"\r\n".to_string(),
            leading: r"\r\n".to_string(),
            boundary: r"\r".to_string(),
        }
    }
}

/// Decoded byte markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub terminator: Vec<u8>,
    pub leading: Vec<u8>,
    pub boundary: Vec<u8>,
}

impl FramingSettings {
    /// Accumulator bounds.
    pub fn framing_config(&self) -> FramingConfig {
        FramingConfig::default()
            .with_capacity(self.capacity)
            .with_chunk_size(self.chunk_size)
            .with_idle_timeout(Duration::from_millis(self.idle_timeout_ms))
    }

    /// Parses the escaped marker strings.
    pub fn markers(&self) -> CliResult<Markers> {
        Ok(Markers {
            terminator: parse_escaped(&self.terminator)?,
            leading: parse_escaped(&self.leading)?,
            boundary: parse_escaped(&self.boundary)?,
        })
    }
}

impl CliConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("serialframe")
    }

    /// Checks everything that can be checked without opening the device.
    pub fn validate(&self) -> CliResult<()> {
        if self.port.baud_rate == 0 {
            return Err(CliError::Config("baud_rate must be positive".to_string()));
        }
        self.framing.framing_config().validate()?;
        let markers = self.framing.markers()?;
        if markers.boundary.is_empty() {
            return Err(CliError::Config("boundary must not be empty".to_string()));
        }
        Ok(())
    }

    /// Port settings, failing when no device is configured.
    pub fn port_settings(&self) -> CliResult<PortSettings> {
        if self.port.device.is_empty() {
            return Err(CliError::NoDevice);
        }
        Ok(self.port.clone())
    }

    /// Connector honouring the configured read timeout.
    pub fn connector(&self) -> SerialConnector {
        SerialConnector::new(Duration::from_millis(self.framing.read_timeout_ms.max(1)))
    }

    /// Configuration for a [`serialframe_port::Receiver`].
    pub fn receiver_config(&self) -> CliResult<ReceiverConfig> {
        let markers = self.framing.markers()?;
        Ok(ReceiverConfig {
            framing: self.framing.framing_config(),
            terminator: markers.terminator,
            leading: markers.leading,
            boundary: markers.boundary,
        })
    }

    /// Configuration for a [`serialframe_port::AtPort`].
    pub fn at_config(&self) -> CliResult<AtConfig> {
        let markers = self.framing.markers()?;
        Ok(AtConfig {
            framing: self.framing.framing_config(),
            suffix: markers.terminator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialframe_core::{Parity, StopBits};
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CliConfig::default();
        assert_eq!(config.port.baud_rate, 9600);
        assert!(config.port.device.is_empty());
        assert!(config.validate().is_ok());

        let markers = config.framing.markers().unwrap();
        assert_eq!(markers.terminator, b"\r\n");
        assert_eq!(markers.leading, b"\r\n");
        assert_eq!(markers.boundary, b"\r");
        assert!(config.framing.framing_config().idle_timeout.is_none());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[port]
device = "/dev/ttyUSB0"
baud_rate = 115200
parity = "even"
stop_bits = "2"

[framing]
idle_timeout_ms = 5000
terminator = '\r'
boundary = '\x0D\x0A'
"#
        )
        .unwrap();

        let config = CliConfig::load_from(file.path()).unwrap();
        assert_eq!(config.port.device, "/dev/ttyUSB0");
        assert_eq!(config.port.baud_rate, 115200);
        assert_eq!(config.port.parity, Parity::Even);
        assert_eq!(config.port.stop_bits, StopBits::Two);

        let receiver = config.receiver_config().unwrap();
        assert_eq!(receiver.terminator, b"\r");
        assert_eq!(receiver.leading, b"\r\n");
        assert_eq!(receiver.boundary, b"\r\n");
        assert_eq!(receiver.framing.idle_timeout, Some(Duration::from_secs(5)));
        assert_eq!(receiver.framing.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn load_from_invalid_toml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[port]\nbaud_rate = \"fast\"\n").unwrap();
        assert!(matches!(
            CliConfig::load_from(file.path()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = CliConfig::default();
        config.port = PortSettings::new("COM3", 57600).with_parity(Parity::Odd);
        config.framing.boundary = r"\x03".to_string();

        let text = config.to_toml().unwrap();
        let parsed: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = CliConfig::default();
        config.framing.chunk_size = config.framing.capacity + 1;
        assert!(matches!(config.validate(), Err(CliError::Framing(_))));

        let mut config = CliConfig::default();
        config.framing.boundary = String::new();
        assert!(matches!(config.validate(), Err(CliError::Config(_))));

        let mut config = CliConfig::default();
        config.framing.leading = r"\q".to_string();
        assert!(matches!(config.validate(), Err(CliError::Settings(_))));
    }

    #[test]
    fn port_settings_require_device() {
        let config = CliConfig::default();
        assert!(matches!(config.port_settings(), Err(CliError::NoDevice)));
    }
}
