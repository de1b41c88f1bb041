//! Line encoding and synchronous stream adapters.
//!
//! Outbound payloads get a terminator appended:
//!
//! ```text
//! +------------------+--------------------+
//! |  payload         |  terminator (opt.) |
//! +------------------+--------------------+
//! ```
//!
//! Inbound, [`FrameReader`] pulls chunks from any [`Read`] through an
//! [`Accumulator`] and yields frames, which is handy for replaying
//! captured traffic without a live port.

use std::io::{ErrorKind, Read, Write};

use crate::accumulator::Accumulator;
use crate::config::FramingConfig;
use crate::error::FramingResult;
use crate::frame::Frame;

/// Appends `terminator` to `payload`.
///
/// # Example
///
/// ```rust
/// use serialframe_protocol::encode_line;
///
/// assert_eq!(encode_line(b"PING", b"\r\n"), b"PING\r\n");
/// assert_eq!(encode_line(b"PING", b""), b"PING");
/// ```
pub fn encode_line(payload: &[u8], terminator: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(payload.len() + terminator.len());
    buffer.extend_from_slice(payload);
    buffer.extend_from_slice(terminator);
    buffer
}

/// Reads delimited frames from a byte stream.
pub struct FrameReader<R> {
    reader: R,
    accumulator: Accumulator,
    chunk: Vec<u8>,
    leading: Vec<u8>,
    boundary: Vec<u8>,
    eof: bool,
}

impl<R: Read> FrameReader<R> {
    /// Creates a FrameReader cutting frames at `boundary` after stripping `leading`.
    pub fn new(
        reader: R,
        config: &FramingConfig,
        leading: impl Into<Vec<u8>>,
        boundary: impl Into<Vec<u8>>,
    ) -> FramingResult<Self> {
        config.validate()?;
        Ok(Self {
            reader,
            accumulator: Accumulator::new(config),
            chunk: vec![0u8; config.chunk_size],
            leading: leading.into(),
            boundary: boundary.into(),
            eof: false,
        })
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` at end of stream. Bytes after the last boundary
    /// are not a frame; see [`FrameReader::remainder`].
    pub fn read_frame(&mut self) -> FramingResult<Option<Frame>> {
        loop {
            if let Some(frame) = self.accumulator.extract_frame(&self.leading, &self.boundary) {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(None);
            }

            match self.reader.read(&mut self.chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    self.accumulator.ingest(&self.chunk[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Bytes buffered but not yet terminated by a boundary.
    pub fn remainder(&self) -> &[u8] {
        self.accumulator.as_slice()
    }

    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Unwraps this FrameReader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = FramingResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// Writes payloads followed by a terminator.
pub struct LineWriter<W> {
    writer: W,
    terminator: Vec<u8>,
}

impl<W: Write> LineWriter<W> {
    /// Creates a LineWriter appending `terminator` to every line.
    pub fn new(writer: W, terminator: impl Into<Vec<u8>>) -> Self {
        Self {
            writer,
            terminator: terminator.into(),
        }
    }

    /// Writes `payload` and the terminator in a single write call.
    ///
    /// Returns the byte count reported by the writer, which may be short;
    /// partial writes are not retried.
    pub fn write_line(&mut self, payload: &[u8]) -> FramingResult<usize> {
        let data = encode_line(payload, &self.terminator);
        Ok(self.writer.write(&data)?)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> FramingResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// The terminator appended to each line.
    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// Replaces the terminator.
    pub fn set_terminator(&mut self, terminator: impl Into<Vec<u8>>) {
        self.terminator = terminator.into();
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwraps this LineWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
