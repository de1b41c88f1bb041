//! Configuration commands.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::CliResult;

/// Dump the current configuration to stdout.
pub fn dump(config: &CliConfig) -> CliResult<()> {
    println!("# config.toml ({})", CliConfig::default_path().display());
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &CliConfig) -> CliResult<()> {
    config.validate()?;
    if config.port.device.is_empty() {
        println!("No device configured; pass --device on the command line.");
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(explicit: Option<&Path>) -> CliResult<()> {
    match explicit {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: {}", CliConfig::default_path().display()),
    }
    Ok(())
}
