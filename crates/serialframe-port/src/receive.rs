//! The background receive loop.
//!
//! Reads chunks from the transport and merges them into the shared
//! accumulator until the stop flag is raised or a read fails for real.
//! End of stream, timeouts and interrupted reads are retried.

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, info, trace};

use serialframe_protocol::Ingest;

use crate::error::{PortError, PortResult};
use crate::shared::Shared;
use crate::transport::Transport;

/// Handle on a receive loop running in its own thread.
#[derive(Debug)]
pub struct ReceiveHandle {
    thread: JoinHandle<PortResult<()>>,
    stop: Arc<AtomicBool>,
}

impl ReceiveHandle {
    /// Asks the loop to stop after its current read.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the loop to exit and returns why it stopped.
    ///
    /// `Ok(())` after a requested stop, the transport error otherwise.
    pub fn join(self) -> PortResult<()> {
        self.thread.join().unwrap_or(Err(PortError::LoopPanicked))
    }
}

/// Spawns [`run_loop`] on a named thread.
pub(crate) fn spawn_loop(
    transport: Box<dyn Transport>,
    shared: Arc<Shared>,
    chunk_size: usize,
    stop: Arc<AtomicBool>,
) -> PortResult<ReceiveHandle> {
    let loop_shared = shared.clone();
    let loop_stop = stop.clone();
    let spawned = thread::Builder::new()
        .name("serialframe-rx".to_string())
        .spawn(move || run_loop(transport, &loop_shared, chunk_size, &loop_stop));

    match spawned {
        Ok(thread) => Ok(ReceiveHandle { thread, stop }),
        Err(e) => {
            shared.lock().running = false;
            Err(e.into())
        }
    }
}

/// Runs the receive loop on the current thread.
///
/// The caller must have marked the shared state as running. On exit the
/// accumulator is cleared, the state is marked stopped and waiters are woken.
pub(crate) fn run_loop(
    mut transport: Box<dyn Transport>,
    shared: &Shared,
    chunk_size: usize,
    stop: &AtomicBool,
) -> PortResult<()> {
    let mut chunk = vec![0u8; chunk_size];
    shared.lock().accumulator.restart_clock(Instant::now());
    debug!(chunk_size, "Receive loop started");

    let result = loop {
        if stop.load(Ordering::Acquire) {
            break Ok(());
        }

        match transport.read(&mut chunk) {
            Ok(0) => thread::yield_now(),
            Ok(n) => {
                let outcome = shared.lock().accumulator.ingest(&chunk[..n]);
                match outcome {
                    Ingest::IdleReset { dropped } if dropped > 0 => {
                        debug!(dropped, "Discarded stale bytes after idle gap");
                    }
                    Ingest::OverflowReset { dropped } => {
                        debug!(dropped, "Discarded buffered bytes on overflow");
                    }
                    _ => trace!(len = n, "Received chunk"),
                }
                shared.notify();
            }
            Err(e) if is_benign(&e) => thread::yield_now(),
            Err(e) => {
                error!(error = %e, "Read failed, stopping receive loop");
                break Err(PortError::Transport(e));
            }
        }
    };

    {
        let mut state = shared.lock();
        state.accumulator.clear();
        state.running = false;
    }
    shared.notify();
    info!(failed = result.is_err(), "Receive loop stopped");
    result
}

fn is_benign(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted | ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockHandle, MockTransport};
    use serialframe_protocol::FramingConfig;
    use std::time::Duration;

    fn running_shared(config: &FramingConfig) -> Arc<Shared> {
        let shared = Arc::new(Shared::new(config));
        shared.lock().running = true;
        shared
    }

    #[test]
    fn benign_errors() {
        assert!(is_benign(&io::Error::from(ErrorKind::TimedOut)));
        assert!(is_benign(&io::Error::from(ErrorKind::Interrupted)));
        assert!(is_benign(&io::Error::from(ErrorKind::UnexpectedEof)));
        assert!(!is_benign(&io::Error::from(ErrorKind::BrokenPipe)));
        assert!(!is_benign(&io::Error::from(ErrorKind::PermissionDenied)));
    }

    #[test]
    fn loop_stops_and_clears_on_failure() {
        let handle = MockHandle::new();
        handle.push_read(b"PARTIAL".to_vec());
        handle.push_failure(ErrorKind::BrokenPipe);

        let config = FramingConfig::default();
        let shared = running_shared(&config);
        let stop = AtomicBool::new(false);

        let result = run_loop(Box::new(MockTransport::new(handle)), &shared, 64, &stop);

        assert!(matches!(result, Err(PortError::Transport(ref e)) if e.kind() == ErrorKind::BrokenPipe));
        let state = shared.lock();
        assert!(state.accumulator.is_empty());
        assert!(!state.running);
    }

    #[test]
    fn loop_retries_benign_reads() {
        let handle = MockHandle::new();
        handle.push_failure(ErrorKind::TimedOut);
        handle.push_failure(ErrorKind::Interrupted);
        handle.push_read(b"AT".to_vec());
        handle.push_failure(ErrorKind::UnexpectedEof);
        handle.push_failure(ErrorKind::WouldBlock);
        handle.push_read(b"+X\r".to_vec());

        let config = FramingConfig::default();
        let shared = running_shared(&config);
        let stop = Arc::new(AtomicBool::new(false));
        let rx = spawn_loop(Box::new(MockTransport::new(handle)), shared.clone(), 64, stop).unwrap();

        let frame = shared.wait_for(Duration::from_secs(5), |state| {
            state.accumulator.extract_frame(b"\r\n", b"\r")
        });
        assert_eq!(frame.unwrap().as_bytes(), b"AT+X");

        rx.stop();
        assert!(rx.join().is_ok());
    }

    #[test]
    fn spawned_loop_stops_on_request() {
        let config = FramingConfig::default();
        let shared = running_shared(&config);
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_loop(
            Box::new(MockTransport::new(MockHandle::new())),
            shared.clone(),
            64,
            stop,
        )
        .unwrap();

        thread::sleep(Duration::from_millis(10));
        assert!(!handle.is_finished());
        handle.stop();
        assert!(handle.join().is_ok());
        assert!(!shared.lock().running);
    }
}
