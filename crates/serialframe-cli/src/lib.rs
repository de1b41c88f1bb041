//! serialframe command-line tool
//!
//! Monitors a serial device, drives AT command sessions and decodes
//! captured byte streams using the framing engines from `serialframe-port`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
