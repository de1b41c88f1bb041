//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use serialframe_core::{DataBits, LogFormat, Parity, PortSettings, StopBits};

/// serialframe - Frame, send and watch serial traffic
#[derive(Debug, Parser)]
#[command(name = "serialframe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "SERIALFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format on stderr (text, compact, json)
    #[arg(long, global = true, env = "SERIALFRAME_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Output frames and listings as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Port overrides shared by commands that open a device.
#[derive(Debug, Clone, Default, Args)]
pub struct PortArgs {
    /// Device path (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, short, env = "SERIALFRAME_DEVICE")]
    pub device: Option<String>,

    /// Baud rate
    #[arg(long, short)]
    pub baud: Option<u32>,

    /// Data bits (5-8)
    #[arg(long, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub data_bits: Option<u8>,

    /// Parity (none, odd, even, mark, space)
    #[arg(long)]
    pub parity: Option<Parity>,

    /// Stop bits (1, 1.5, 2)
    #[arg(long)]
    pub stop_bits: Option<StopBits>,
}

impl PortArgs {
    /// Applies the flags given on the command line over `settings`.
    pub fn apply(&self, settings: &mut PortSettings) {
        if let Some(ref device) = self.device {
            settings.device = device.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(bits) = self.data_bits.and_then(|b| DataBits::try_from(b).ok()) {
            settings.data_bits = bits;
        }
        if let Some(parity) = self.parity {
            settings.parity = parity;
        }
        if let Some(stop_bits) = self.stop_bits {
            settings.stop_bits = stop_bits;
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List serial devices
    List,

    /// Print every frame received, optionally sending a command periodically
    Monitor {
        #[command(flatten)]
        port: PortArgs,

        /// Command to send periodically (escapes allowed)
        #[arg(long, short)]
        send: Option<String>,

        /// Seconds between two sends
        #[arg(long, default_value = "5")]
        interval: u64,

        /// Exit after this many frames
        #[arg(long, short = 'n')]
        count: Option<usize>,
    },

    /// Send AT commands and print the responses
    At {
        #[command(flatten)]
        port: PortArgs,

        /// Commands to send in order; reads stdin lines when none are given
        commands: Vec<String>,

        /// Milliseconds of silence that end a response
        #[arg(long, default_value = "1000")]
        timeout: u64,
    },

    /// Send one payload, optionally waiting for a reply frame
    Send {
        #[command(flatten)]
        port: PortArgs,

        /// Payload (escapes allowed)
        payload: String,

        /// Milliseconds to wait for a reply; 0 sends without waiting
        #[arg(long, short, default_value = "0")]
        wait: u64,
    },

    /// Split a captured byte stream into frames
    Decode {
        /// Capture file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Boundary marker, overrides the config file
        #[arg(long)]
        boundary: Option<String>,

        /// Leading bytes to strip; defaults to the boundary bytes when
        /// --boundary is given, the config file otherwise
        #[arg(long)]
        leading: Option<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
