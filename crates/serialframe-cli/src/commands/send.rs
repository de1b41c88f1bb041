//! One-shot send with an optional reply.

use std::io::{self, Write};
use std::time::Duration;

use chrono::Local;
use tracing::warn;

use serialframe_core::parse_escaped;
use serialframe_port::{Frame, Receiver};

use crate::cli::PortArgs;
use crate::commands::resolve_port;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{Direction, render_frame};

/// Sends `payload` and, when `wait_ms > 0`, prints the first reply frame.
pub async fn run(
    config: CliConfig,
    port: PortArgs,
    payload: String,
    wait_ms: u64,
    json: bool,
) -> CliResult<()> {
    let settings = resolve_port(&config, &port)?;
    let payload = parse_escaped(&payload)?;
    let receiver = Receiver::with_connector(settings, config.connector())
        .with_config(config.receiver_config()?);
    let wait = Duration::from_millis(wait_ms);

    tokio::task::spawn_blocking(move || -> CliResult<()> {
        receiver.open()?;
        // Listen before sending so a fast reply is not lost.
        let rx = if wait.is_zero() {
            None
        } else {
            Some(receiver.start()?)
        };

        let result = exchange(&receiver, &payload, wait, json, &mut io::stdout().lock());
        receiver.close()?;
        if let Some(rx) = rx {
            rx.join()?;
        }
        result.map(|_| ())
    })
    .await?
}

/// Writes `payload` and waits up to `wait` for one reply frame.
pub fn exchange<W: Write>(
    receiver: &Receiver,
    payload: &[u8],
    wait: Duration,
    json: bool,
    out: &mut W,
) -> CliResult<Option<Frame>> {
    let written = receiver.write(payload)?;
    let expected = payload.len() + receiver.config().terminator.len();
    if written < expected {
        warn!(written, expected, "Short write");
    }
    writeln!(out, "{}", render_frame(payload, Direction::Send, &Local::now(), json))?;

    if wait.is_zero() {
        return Ok(None);
    }

    let config = receiver.config();
    let reply = receiver.wait_frame(&config.leading, &config.boundary, wait);
    match reply {
        Some(ref frame) => {
            writeln!(out, "{}", render_frame(frame, Direction::Recv, &Local::now(), json))?;
        }
        None => warn!(wait_ms = wait.as_millis() as u64, "No reply"),
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialframe_core::PortSettings;
    use serialframe_port::{MockConnector, MockHandle};

    fn mock_receiver() -> (Receiver, MockHandle) {
        let handle = MockHandle::new();
        let config = CliConfig::default().receiver_config().unwrap();
        let receiver = Receiver::with_connector(
            PortSettings::new("mock", 9600),
            MockConnector::new(handle.clone()),
        )
        .with_config(config);
        receiver.open().unwrap();
        (receiver, handle)
    }

    #[test]
    fn send_without_wait() {
        let (receiver, handle) = mock_receiver();
        let mut out = Vec::new();

        let reply = exchange(&receiver, b"PING", Duration::ZERO, false, &mut out).unwrap();
        assert!(reply.is_none());
        assert_eq!(handle.written(), b"PING\r\n");

        let out = String::from_utf8(out).unwrap();
        assert!(out.trim_end().ends_with("Send PING"), "{out}");
    }

    #[test]
    fn send_and_wait_for_reply() {
        let (receiver, handle) = mock_receiver();
        let rx = receiver.start().unwrap();
        handle.push_read(b"\r\nPONG\r\n".to_vec());

        let mut out = Vec::new();
        let reply = exchange(&receiver, b"PING", Duration::from_secs(5), true, &mut out).unwrap();
        assert_eq!(reply.unwrap().as_bytes(), b"PONG");

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["direction"], "send");
        assert_eq!(lines[0]["text"], "PING");
        assert_eq!(lines[1]["direction"], "recv");
        assert_eq!(lines[1]["text"], "PONG");

        rx.stop();
        rx.join().unwrap();
    }

    #[test]
    fn wait_times_out_without_reply() {
        let (receiver, _handle) = mock_receiver();
        let rx = receiver.start().unwrap();

        let mut out = Vec::new();
        let reply = exchange(&receiver, b"PING", Duration::from_millis(20), false, &mut out).unwrap();
        assert!(reply.is_none());

        receiver.close().unwrap();
        rx.join().unwrap();
    }
}
