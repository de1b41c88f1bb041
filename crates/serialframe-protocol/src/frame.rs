//! Extracted frames and boundary search.

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use serialframe_core::format_escaped;

/// A complete unit of received data, without its boundary marker.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wraps the given bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Returns the frame payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Unwraps the frame, returning the payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Payload as space separated upper-case hex.
    pub fn to_hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(\"{}\")", format_escaped(&self.bytes))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Finds the first occurrence of `marker` in `haystack`.
///
/// An empty marker never matches.
pub fn find_boundary(haystack: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() || marker.len() > haystack.len() {
        return None;
    }
    if let [single] = marker {
        return haystack.iter().position(|b| b == single);
    }
    haystack
        .windows(marker.len())
        .position(|window| window == marker)
}
