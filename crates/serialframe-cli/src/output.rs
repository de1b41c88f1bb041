//! Rendering of frames and port listings.

use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::Serialize;

use serialframe_core::format_escaped;
use serialframe_port::PortInfo;
use serialframe_protocol::Frame;

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "Send"),
            Self::Recv => write!(f, "Recv"),
        }
    }
}

/// One frame as emitted with `--json`.
#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    timestamp: String,
    direction: Direction,
    len: usize,
    text: &'a str,
    hex: String,
}

/// Renders a frame as one output line.
pub fn render_frame<Tz: TimeZone>(
    bytes: &[u8],
    direction: Direction,
    at: &DateTime<Tz>,
    json: bool,
) -> String
where
    Tz::Offset: fmt::Display,
{
    let text = format_escaped(bytes);
    if json {
        let record = FrameRecord {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            direction,
            len: bytes.len(),
            text: &text,
            hex: Frame::new(bytes).to_hex(),
        };
        // FrameRecord only holds strings and integers
        serde_json::to_string(&record).unwrap_or_default()
    } else {
        format!("{} {} {}", at.format("%H:%M:%S%.3f"), direction, text)
    }
}

/// Renders the device listing.
pub fn render_ports(ports: &[PortInfo], json: bool) -> String {
    if json {
        return ports
            .iter()
            .filter_map(|p| serde_json::to_string(p).ok())
            .collect::<Vec<_>>()
            .join("\n");
    }
    if ports.is_empty() {
        return "No serial ports found.".to_string();
    }

    ports
        .iter()
        .map(|p| {
            let ids = match (p.vid, p.pid) {
                (Some(vid), Some(pid)) => format!("{:04x}:{:04x}", vid, pid),
                _ => "-".to_string(),
            };
            let description = [p.manufacturer.as_deref(), p.product.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            format!("{:<20} {:<9} {:<9} {}", p.port_name, p.port_type, ids, description)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap()
    }

    #[test]
    fn text_frame() {
        insta::assert_snapshot!(
            render_frame(b"+CSQ: 20,0", Direction::Recv, &noon(), false),
            @"12:00:05.000 Recv +CSQ: 20,0"
        );
        insta::assert_snapshot!(
            render_frame(b"AT\r\n", Direction::Send, &noon(), false),
            @r"12:00:05.000 Send AT\r\n"
        );
    }

    #[test]
    fn json_frame() {
        insta::assert_snapshot!(
            render_frame(b"OK\x01", Direction::Recv, &noon(), true),
            @r#"{"timestamp":"2024-03-01T12:00:05.000Z","direction":"recv","len":3,"text":"OK\\x01","hex":"4F 4B 01"}"#
        );
    }

    #[test]
    fn port_listing() {
        let ports = vec![
            PortInfo {
                port_name: "/dev/ttyUSB0".to_string(),
                port_type: "usb".to_string(),
                manufacturer: Some("FTDI".to_string()),
                product: Some("FT232R USB UART".to_string()),
                serial_number: None,
                vid: Some(0x0403),
                pid: Some(0x6001),
            },
            PortInfo {
                port_name: "/dev/ttyS0".to_string(),
                port_type: "unknown".to_string(),
                manufacturer: None,
                product: None,
                serial_number: None,
                vid: None,
                pid: None,
            },
        ];

        insta::assert_snapshot!(render_ports(&ports, false), @r"
        /dev/ttyUSB0         usb       0403:6001 FTDI FT232R USB UART
        /dev/ttyS0           unknown   -
        ");
        assert_eq!(render_ports(&[], false), "No serial ports found.");
        assert_eq!(render_ports(&ports, true).lines().count(), 2);
    }
}
