//! State shared between the receive loop and frame consumers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serialframe_protocol::{Accumulator, FrameQueue, FramingConfig};

/// Everything guarded by the shared lock.
#[derive(Debug)]
pub(crate) struct State {
    pub accumulator: Accumulator,
    pub queue: FrameQueue,
    pub running: bool,
}

/// Accumulator and frame queue behind one mutex, plus a condition
/// variable signalled after every ingest and when the loop stops.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<State>,
    ready: Condvar,
}

impl Shared {
    pub fn new(config: &FramingConfig) -> Self {
        Self {
            state: Mutex::new(State {
                accumulator: Accumulator::new(config),
                queue: FrameQueue::new(),
                running: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Locks the state. A panic while holding the lock leaves the buffer
    /// consistent (every mutation is a single call), so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes every waiter.
    pub fn notify(&self) {
        self.ready.notify_all();
    }

    /// Runs `poll` under the lock until it yields a value, the loop stops,
    /// or `timeout` elapses.
    pub fn wait_for<T>(
        &self,
        timeout: Duration,
        mut poll: impl FnMut(&mut State) -> Option<T>,
    ) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock();
        loop {
            if let Some(value) = poll(&mut guard) {
                return Some(value);
            }
            if !guard.running {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            guard = self
                .ready
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
