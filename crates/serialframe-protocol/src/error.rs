//! Framing error types.

use thiserror::Error;

/// Result type for framing operations.
pub type FramingResult<T> = Result<T, FramingError>;

/// Errors that can occur while configuring or feeding the framer.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Accumulator capacity of zero.
    #[error("accumulator capacity must be greater than zero")]
    ZeroCapacity,

    /// Read chunk size of zero.
    #[error("read chunk size must be greater than zero")]
    ZeroChunkSize,

    /// A single read could overflow the accumulator on its own.
    #[error("read chunk size {chunk_size} exceeds accumulator capacity {capacity}")]
    ChunkExceedsCapacity { chunk_size: usize, capacity: usize },

    /// IO error from the underlying reader or writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
