//! Bounded byte accumulator with stale-data reset.
//!
//! The accumulator holds bytes received but not yet framed. It never grows
//! past its capacity: a chunk that would overflow it, or that arrives after
//! the idle timeout, *replaces* everything buffered so far. Partial frames
//! are dropped rather than merged with unrelated data.
//!
//! Consumed bytes are released by advancing a head offset; the dead prefix
//! is compacted away once it reaches half of the stored bytes.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::FramingConfig;
use crate::frame::{Frame, find_boundary};
use crate::queue::FrameQueue;

/// What [`Accumulator::ingest`] did with a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// Chunk was empty; nothing changed, the idle clock was not touched.
    Empty,
    /// Chunk was appended after the buffered bytes.
    Appended,
    /// Idle timeout elapsed; `dropped` stale bytes were discarded.
    IdleReset { dropped: usize },
    /// Chunk did not fit; `dropped` buffered bytes were discarded.
    OverflowReset { dropped: usize },
}

impl Ingest {
    /// Returns true if buffered bytes were replaced by the chunk.
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::IdleReset { .. } | Self::OverflowReset { .. })
    }
}

/// Growable, bounded buffer of received bytes.
#[derive(Debug, Clone)]
pub struct Accumulator {
    data: Vec<u8>,
    head: usize,
    capacity: usize,
    idle_timeout: Option<Duration>,
    last_read: Instant,
}

impl Accumulator {
    /// Creates an empty accumulator using the capacity and idle timeout of `config`.
    pub fn new(config: &FramingConfig) -> Self {
        Self {
            data: Vec::with_capacity(config.capacity),
            head: 0,
            capacity: config.capacity,
            idle_timeout: config.idle_timeout,
            last_read: Instant::now(),
        }
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    /// Returns true if there are no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The unconsumed bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.head..]
    }

    /// Maximum number of buffered bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. Takes effect on the next ingest.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Current idle timeout.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Changes the idle timeout. `None` or zero disables it.
    pub fn set_idle_timeout(&mut self, timeout: Option<Duration>) {
        self.idle_timeout = timeout.filter(|t| !t.is_zero());
    }

    /// Restarts the idle clock, e.g. when a receive loop begins.
    pub fn restart_clock(&mut self, now: Instant) {
        self.last_read = now;
    }

    /// Merges a freshly read chunk, timestamped now.
    pub fn ingest(&mut self, chunk: &[u8]) -> Ingest {
        self.ingest_at(chunk, Instant::now())
    }

    /// Merges a chunk read at `now`.
    ///
    /// The chunk replaces the buffered bytes if more than the idle timeout
    /// has passed since the previous non-empty chunk, or if appending it
    /// would exceed the capacity. The idle clock advances on every
    /// non-empty chunk, including ones that trigger a reset.
    pub fn ingest_at(&mut self, chunk: &[u8], now: Instant) -> Ingest {
        if chunk.is_empty() {
            return Ingest::Empty;
        }

        let elapsed = now.saturating_duration_since(self.last_read);
        self.last_read = now;

        let idle = self.idle_timeout.is_some_and(|timeout| elapsed > timeout);
        if idle {
            let dropped = self.replace(chunk);
            trace!(dropped, elapsed_ms = elapsed.as_millis() as u64, "idle reset");
            return Ingest::IdleReset { dropped };
        }

        if self.len() + chunk.len() > self.capacity {
            let dropped = self.replace(chunk);
            trace!(dropped, capacity = self.capacity, "overflow reset");
            return Ingest::OverflowReset { dropped };
        }

        if self.head > 0 && self.data.len() + chunk.len() > self.data.capacity() {
            self.compact();
        }
        self.data.extend_from_slice(chunk);
        Ingest::Appended
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Drops leading bytes while the first byte is any byte of `set`.
    ///
    /// Returns how many bytes were dropped.
    pub fn strip_leading(&mut self, set: &[u8]) -> usize {
        let stripped = self
            .as_slice()
            .iter()
            .take_while(|&&b| set.contains(&b))
            .count();
        self.consume(stripped);
        stripped
    }

    /// Marks the first `n` unconsumed bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        self.head += n.min(self.len());
        if self.head == self.data.len() {
            self.clear();
        } else if self.head * 2 >= self.data.len() {
            self.compact();
        }
    }

    /// Cuts out the next frame, if one is complete.
    ///
    /// Leading bytes in `leading` are stripped first. A frame is the bytes
    /// before the first `boundary`; the boundary itself stays buffered and
    /// is normally stripped as a leading byte by the next call. A boundary
    /// at index 0 does not produce a frame.
    pub fn extract_frame(&mut self, leading: &[u8], boundary: &[u8]) -> Option<Frame> {
        self.strip_leading(leading);
        match find_boundary(self.as_slice(), boundary) {
            Some(index) if index > 0 => {
                let frame = Frame::new(&self.as_slice()[..index]);
                self.consume(index);
                Some(frame)
            }
            _ => None,
        }
    }

    /// Moves every complete frame into `queue`, oldest first.
    ///
    /// Returns how many frames were queued.
    pub fn drain_frames(&mut self, leading: &[u8], boundary: &[u8], queue: &mut FrameQueue) -> usize {
        let mut count = 0;
        while let Some(frame) = self.extract_frame(leading, boundary) {
            queue.push(frame);
            count += 1;
        }
        count
    }

    fn replace(&mut self, chunk: &[u8]) -> usize {
        let dropped = self.len();
        self.clear();
        let start = chunk.len().saturating_sub(self.capacity);
        self.data.extend_from_slice(&chunk[start..]);
        dropped
    }

    fn compact(&mut self) {
        if self.head > 0 {
            self.data.drain(..self.head);
            self.head = 0;
        }
    }
}
