//! Physical port settings.
//!
//! These types only describe the line configuration; opening the device
//! is the transport's job (see `serialframe-port`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing settings from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Unknown parity name.
    #[error("invalid parity: {0} (expected none, odd, even, mark or space)")]
    InvalidParity(String),

    /// Unknown stop bits value.
    #[error("invalid stop bits: {0} (expected 1, 1.5 or 2)")]
    InvalidStopBits(String),

    /// Unsupported data bits count.
    #[error("invalid data bits: {0} (expected 5, 6, 7 or 8)")]
    InvalidDataBits(u8),

    /// Malformed escape sequence in a byte marker.
    #[error("invalid escape sequence at offset {offset}: {reason}")]
    InvalidEscape { offset: usize, reason: String },
}

/// Parity setting for serial port configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    /// Parity bit is always 1.
    Mark,
    /// Parity bit is always 0.
    Space,
}

impl FromStr for Parity {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            "mark" | "m" => Ok(Self::Mark),
            "space" | "s" => Ok(Self::Space),
            _ => Err(SettingsError::InvalidParity(s.to_string())),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
            Self::Mark => 'M',
            Self::Space => 'S',
        };
        write!(f, "{}", c)
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "1.5")]
    OnePointFive,
    #[serde(rename = "2")]
    Two,
}

impl FromStr for StopBits {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::One),
            "1.5" => Ok(Self::OnePointFive),
            "2" => Ok(Self::Two),
            _ => Err(SettingsError::InvalidStopBits(s.to_string())),
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "1"),
            Self::OnePointFive => write!(f, "1.5"),
            Self::Two => write!(f, "2"),
        }
    }
}

/// Character size in bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = SettingsError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(SettingsError::InvalidDataBits(other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Line configuration for a serial device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortSettings {
    /// Device path or name (e.g. `/dev/ttyUSB0`, `COM3`).
    pub device: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl PortSettings {
    /// Creates settings for the given device and baud rate (8-N-1).
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Builder: set data bits.
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Builder: set parity.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Builder: set stop bits.
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }
}

impl fmt::Display for PortSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({}-{}-{})",
            self.device,
            self.baud_rate,
            u8::from(self.data_bits),
            self.parity,
            self.stop_bits
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_9600_8n1() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
    }

    #[test]
    fn builder_methods() {
        let settings = PortSettings::new("/dev/ttyUSB0", 115_200)
            .with_data_bits(DataBits::Seven)
            .with_parity(Parity::Even)
            .with_stop_bits(StopBits::Two);

        assert_eq!(settings.device, "/dev/ttyUSB0");
        assert_eq!(settings.to_string(), "/dev/ttyUSB0 @ 115200 (7-E-2)");
    }

    #[test]
    fn parse_parity() {
        assert_eq!("none".parse::<Parity>().unwrap(), Parity::None);
        assert_eq!("ODD".parse::<Parity>().unwrap(), Parity::Odd);
        assert_eq!("e".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("mark".parse::<Parity>().unwrap(), Parity::Mark);
        assert_eq!("space".parse::<Parity>().unwrap(), Parity::Space);
        assert!(matches!(
            "weird".parse::<Parity>(),
            Err(SettingsError::InvalidParity(_))
        ));
    }

    #[test]
    fn parse_stop_bits() {
        assert_eq!("1".parse::<StopBits>().unwrap(), StopBits::One);
        assert_eq!("1.5".parse::<StopBits>().unwrap(), StopBits::OnePointFive);
        assert_eq!("2".parse::<StopBits>().unwrap(), StopBits::Two);
        assert!("3".parse::<StopBits>().is_err());
    }

    #[test]
    fn data_bits_conversion() {
        assert_eq!(DataBits::try_from(5).unwrap(), DataBits::Five);
        assert_eq!(u8::from(DataBits::Six), 6);
        assert_eq!(
            DataBits::try_from(9),
            Err(SettingsError::InvalidDataBits(9))
        );
    }

    #[test]
    fn settings_json_shape() {
        let settings = PortSettings::new("COM3", 9600).with_stop_bits(StopBits::OnePointFive);
        insta::assert_json_snapshot!(settings, @r#"
        {
          "device": "COM3",
          "baud_rate": 9600,
          "data_bits": 8,
          "parity": "none",
          "stop_bits": "1.5"
        }
        "#);

        let back: PortSettings =
            serde_json::from_str(r#"{"device":"COM3","stop_bits":"1.5"}"#).unwrap();
        assert_eq!(back, settings);
    }
}
