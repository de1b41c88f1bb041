//! Subcommand implementations.

pub mod at;
pub mod config;
pub mod decode;
pub mod list;
pub mod monitor;
pub mod send;

use serialframe_core::PortSettings;

use crate::cli::PortArgs;
use crate::config::CliConfig;
use crate::error::CliResult;

/// Config file port settings with command-line overrides applied.
pub(crate) fn resolve_port(config: &CliConfig, args: &PortArgs) -> CliResult<PortSettings> {
    let mut config = config.clone();
    args.apply(&mut config.port);
    config.port_settings()
}
