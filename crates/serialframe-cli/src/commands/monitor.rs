//! Live frame monitor.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use serialframe_core::parse_escaped;
use serialframe_port::Receiver;

use crate::cli::PortArgs;
use crate::commands::resolve_port;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{Direction, render_frame};

/// How long the printer blocks before re-checking the stop flag.
const POLL: Duration = Duration::from_millis(200);

/// Prints frames until Ctrl-C, `count` frames, or the receive loop dies.
pub async fn run(
    config: CliConfig,
    port: PortArgs,
    send: Option<String>,
    interval_secs: u64,
    count: Option<usize>,
    json: bool,
) -> CliResult<()> {
    let settings = resolve_port(&config, &port)?;
    let command = send.as_deref().map(parse_escaped).transpose()?;
    let receiver = Arc::new(
        Receiver::with_connector(settings, config.connector())
            .with_config(config.receiver_config()?),
    );

    receiver.open()?;
    let rx = receiver.start()?;
    info!(port = %receiver.settings(), "Monitoring, press Ctrl-C to stop");

    let stop = Arc::new(AtomicBool::new(false));
    let mut printer = tokio::task::spawn_blocking({
        let receiver = receiver.clone();
        let stop = stop.clone();
        move || print_frames(&receiver, &stop, count, json, &mut io::stdout())
    });

    let every = Duration::from_secs(interval_secs.max(1));
    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            None
        }
        result = &mut printer => Some(result),
        _ = send_periodically(&receiver, command, every, json) => None,
    };

    stop.store(true, Ordering::Release);
    let printed = match finished {
        Some(result) => result??,
        None => printer.await??,
    };
    info!(frames = printed, "Monitor finished");

    receiver.close()?;
    rx.join()?;
    Ok(())
}

/// Blocks on the receiver and prints every frame as it completes.
pub fn print_frames<W: Write>(
    receiver: &Receiver,
    stop: &AtomicBool,
    count: Option<usize>,
    json: bool,
    out: &mut W,
) -> CliResult<usize> {
    let config = receiver.config();
    let mut printed = 0;

    while !stop.load(Ordering::Acquire) && count.is_none_or(|limit| printed < limit) {
        match receiver.wait_frame(&config.leading, &config.boundary, POLL) {
            Some(frame) => {
                writeln!(out, "{}", render_frame(&frame, Direction::Recv, &Local::now(), json))?;
                out.flush()?;
                printed += 1;
            }
            None if !receiver.is_receiving() => {
                warn!("Receive loop stopped");
                break;
            }
            None => {}
        }
    }
    Ok(printed)
}

/// Writes `command` every `every`, starting one period from now. Never
/// returns; without a command it just waits to be dropped.
pub async fn send_periodically(
    receiver: &Receiver,
    command: Option<Vec<u8>>,
    every: Duration,
    json: bool,
) {
    let Some(command) = command else {
        return std::future::pending().await;
    };

    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match receiver.write(&command) {
            Ok(_) => println!("{}", render_frame(&command, Direction::Send, &Local::now(), json)),
            Err(e) => warn!(error = %e, "Send failed"),
        }
    }
}
