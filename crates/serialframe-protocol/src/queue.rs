//! FIFO of frames split eagerly out of the accumulator.

use std::collections::VecDeque;

use crate::frame::Frame;

/// Ordered frames awaiting delivery.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    frames: VecDeque<Frame>,
}

impl FrameQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame at the back.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    /// Removes and returns the oldest frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// The oldest frame, without removing it.
    pub fn peek(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
