//! Line-oriented request/response surface.

use serialframe_protocol::Frame;

use crate::error::PortResult;

/// Send a line, poll for the next received line.
///
/// `read_line` never blocks; `None` means no complete line yet.
pub trait LineIo {
    /// Writes `line` followed by the engine's terminator.
    fn write_line(&self, line: &[u8]) -> PortResult<usize>;

    /// Returns the next complete line, if any.
    fn read_line(&self) -> Option<Frame>;
}
