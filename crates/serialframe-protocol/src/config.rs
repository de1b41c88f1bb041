//! Accumulator configuration.

use std::time::Duration;

use crate::error::{FramingError, FramingResult};
use crate::{DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE};

/// Bounds applied to the accumulator and the read loop feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingConfig {
    /// Maximum number of buffered, not yet framed bytes.
    pub capacity: usize,

    /// Size of the buffer handed to each transport read.
    pub chunk_size: usize,

    /// Gap between two reads after which buffered bytes are considered stale.
    pub idle_timeout: Option<Duration>,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            idle_timeout: None,
        }
    }
}

impl FramingConfig {
    /// Builder: set accumulator capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder: set read chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Builder: set idle timeout. A zero duration disables it.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Checks that a single read can never overflow the accumulator.
    pub fn validate(&self) -> FramingResult<()> {
        if self.capacity == 0 {
            return Err(FramingError::ZeroCapacity);
        }
        if self.chunk_size == 0 {
            return Err(FramingError::ZeroChunkSize);
        }
        if self.chunk_size > self.capacity {
            return Err(FramingError::ChunkExceedsCapacity {
                chunk_size: self.chunk_size,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
