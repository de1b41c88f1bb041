//! Delimiter framing over a raw byte stream.
//!
//! Bytes arrive in arbitrary chunks and are merged into a bounded
//! [`Accumulator`]. Frames are cut out of it in one of two ways:
//!
//! - on demand with [`Accumulator::extract_frame`], one frame per call;
//! - eagerly with [`Accumulator::drain_frames`], which moves every complete
//!   frame into a [`FrameQueue`].
//!
//! Before each boundary search, any run of "leading" bytes (typically the
//! CR/LF left over from the previous frame) is stripped one byte at a time.
//! A boundary found at index 0 is never a frame.
//!
//! # Example
//!
//! ```rust
//! use serialframe_protocol::{Accumulator, FramingConfig};
//!
//! let mut acc = Accumulator::new(&FramingConfig::default());
//! acc.ingest(b"\r\nOK\r\n+CSQ: 20,99\r");
//!
//! let first = acc.extract_frame(b"\r\n", b"\r").unwrap();
//! assert_eq!(first.as_bytes(), b"OK");
//! let second = acc.extract_frame(b"\r\n", b"\r").unwrap();
//! assert_eq!(second.as_bytes(), b"+CSQ: 20,99");
//! assert!(acc.extract_frame(b"\r\n", b"\r").is_none());
//! ```

mod accumulator;
mod config;
mod error;
mod frame;
mod framing;
mod queue;

pub use accumulator::{Accumulator, Ingest};
pub use config::FramingConfig;
pub use error::{FramingError, FramingResult};
pub use frame::{Frame, find_boundary};
pub use framing::{FrameReader, LineWriter, encode_line};
pub use queue::FrameQueue;

/// Default accumulator capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Default size of a single transport read.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Response boundary used by AT-command devices.
pub const AT_BOUNDARY: &[u8] = b"\r";

/// Separator bytes stripped ahead of an AT response.
pub const AT_LEADING: &[u8] = b"\r\n";
