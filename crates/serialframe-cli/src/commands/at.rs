//! AT command session.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use chrono::Local;
use tracing::debug;

use serialframe_core::parse_escaped;
use serialframe_port::{AtPort, LineIo};

use crate::cli::PortArgs;
use crate::commands::resolve_port;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{Direction, render_frame};

/// Opens the device, runs every command, then closes it.
///
/// With no commands, lines are read from stdin until end of input.
pub async fn run(
    config: CliConfig,
    port: PortArgs,
    commands: Vec<String>,
    quiet_ms: u64,
    json: bool,
) -> CliResult<()> {
    let settings = resolve_port(&config, &port)?;
    let at_config = config.at_config()?;
    let connector = config.connector();
    let quiet = Duration::from_millis(quiet_ms);

    tokio::task::spawn_blocking(move || -> CliResult<()> {
        let at = AtPort::open_with(settings, &connector, at_config)?;
        let mut out = io::stdout().lock();
        let result = if commands.is_empty() {
            session(&at, io::stdin().lock().lines(), quiet, json, &mut out)
        } else {
            session(&at, commands.into_iter().map(Ok), quiet, json, &mut out)
        };
        at.close()?;
        result.map(|_| ())
    })
    .await?
}

/// Sends each command and prints the responses that follow it, until
/// nothing arrives for `quiet`. Returns the number of responses.
pub fn session<I, W>(
    at: &AtPort,
    commands: I,
    quiet: Duration,
    json: bool,
    out: &mut W,
) -> CliResult<usize>
where
    I: IntoIterator<Item = io::Result<String>>,
    W: Write,
{
    let mut responses = 0;
    for line in commands {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let payload = parse_escaped(line)?;
        at.write_line(&payload)?;
        writeln!(out, "{}", render_frame(&payload, Direction::Send, &Local::now(), json))?;

        while let Some(response) = at.read_line_timeout(quiet) {
            writeln!(out, "{}", render_frame(&response, Direction::Recv, &Local::now(), json))?;
            responses += 1;
        }
        out.flush()?;
        debug!(command = line, pending = at.pending(), "Command done");
    }
    Ok(responses)
}
