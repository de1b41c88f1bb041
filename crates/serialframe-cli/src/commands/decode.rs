//! Offline decoding of captured byte streams.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use serialframe_core::{format_escaped, parse_escaped};
use serialframe_protocol::{FrameReader, FramingConfig};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// What a decode run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    pub frames: usize,
    /// Trailing bytes not closed by a boundary.
    pub remainder: Vec<u8>,
}

#[derive(Serialize)]
struct DecodedFrame<'a> {
    index: usize,
    len: usize,
    text: &'a str,
}

/// Decodes `file` (or stdin) and prints one frame per line.
pub fn run(
    config: &CliConfig,
    file: Option<&Path>,
    leading: Option<&str>,
    boundary: Option<&str>,
    json: bool,
) -> CliResult<()> {
    let markers = config.framing.markers()?;
    let boundary = match boundary {
        Some(text) => parse_escaped(text)?,
        None => markers.boundary.clone(),
    };
    // A custom boundary would otherwise sit at the front of the buffer forever.
    let leading = match leading {
        Some(text) => parse_escaped(text)?,
        None if boundary != markers.boundary => boundary.clone(),
        None => markers.leading,
    };
    // Replayed data arrives as fast as it can be read; gaps mean nothing.
    let framing = config
        .framing
        .framing_config()
        .with_idle_timeout(Duration::ZERO);

    let reader: Box<dyn Read> = match file {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let summary = decode_stream(reader, io::stdout().lock(), &framing, &leading, &boundary, json)?;

    info!(frames = summary.frames, "Decoded capture");
    if !summary.remainder.is_empty() {
        warn!(
            len = summary.remainder.len(),
            tail = %format_escaped(&summary.remainder),
            "Capture ends inside a frame"
        );
    }
    Ok(())
}

/// Splits `reader` into frames and writes them to `out`.
pub fn decode_stream<R: Read, W: Write>(
    reader: R,
    mut out: W,
    framing: &FramingConfig,
    leading: &[u8],
    boundary: &[u8],
    json: bool,
) -> CliResult<DecodeSummary> {
    if boundary.is_empty() {
        return Err(CliError::Config("boundary must not be empty".to_string()));
    }

    let mut frames = FrameReader::new(reader, framing, leading, boundary)?;
    let mut count = 0;
    while let Some(frame) = frames.read_frame()? {
        let text = format_escaped(&frame);
        if json {
            let record = DecodedFrame {
                index: count,
                len: frame.len(),
                text: &text,
            };
            let line = serde_json::to_string(&record)
                .map_err(|e| CliError::Config(format!("failed to encode frame: {}", e)))?;
            writeln!(out, "{}", line)?;
        } else {
            writeln!(out, "{}", text)?;
        }
        count += 1;
    }
    out.flush()?;

    Ok(DecodeSummary {
        frames: count,
        remainder: frames.remainder().to_vec(),
    })
}
