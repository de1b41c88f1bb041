//! serialframe CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use serialframe_cli::cli::{Cli, Command, ConfigAction};
use serialframe_cli::commands;
use serialframe_cli::config::CliConfig;
use serialframe_cli::error::CliResult;
use serialframe_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    init_tracing(TracingConfig::for_verbosity(cli.verbose).with_format(cli.log_format))?;

    let Cli {
        config: config_path,
        json,
        command,
        ..
    } = cli;

    let config = match config_path {
        Some(ref path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };

    match command {
        Command::List => commands::list::run(json),
        Command::Monitor {
            port,
            send,
            interval,
            count,
        } => commands::monitor::run(config, port, send, interval, count, json).await,
        Command::At {
            port,
            commands: lines,
            timeout,
        } => commands::at::run(config, port, lines, timeout, json).await,
        Command::Send {
            port,
            payload,
            wait,
        } => commands::send::run(config, port, payload, wait, json).await,
        Command::Decode {
            file,
            boundary,
            leading,
        } => commands::decode::run(
            &config,
            file.as_deref(),
            leading.as_deref(),
            boundary.as_deref(),
            json,
        ),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(config_path.as_deref()),
        },
    }
}
