//! In-memory transport for tests and dry runs.
//!
//! A [`MockHandle`] scripts what the device "sends" and records what was
//! written to it. Every [`MockTransport`] opened from the same handle,
//! including clones made for the receive loop, shares that state.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use serialframe_core::PortSettings;

use crate::error::PortResult;
use crate::transport::{Connector, Transport};

/// How long an idle mock read waits before reporting a timeout.
const IDLE_READ: Duration = Duration::from_millis(1);

#[derive(Debug)]
enum Scripted {
    Data(Vec<u8>),
    Fail(ErrorKind),
    Pause(Duration),
}

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<Scripted>,
    written: Vec<u8>,
    write_limit: Option<usize>,
    discards: usize,
    opens: usize,
    disconnected: bool,
    open_error: Option<ErrorKind>,
}

/// Shared script and capture for mock transports.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues bytes to be returned by subsequent reads.
    pub fn push_read(&self, bytes: impl Into<Vec<u8>>) {
        self.lock().inbound.push_back(Scripted::Data(bytes.into()));
    }

    /// Queues a read failure of the given kind.
    pub fn push_failure(&self, kind: ErrorKind) {
        self.lock().inbound.push_back(Scripted::Fail(kind));
    }

    /// Queues a silent gap: the next read sleeps, then returns nothing.
    pub fn push_pause(&self, duration: Duration) {
        self.lock().inbound.push_back(Scripted::Pause(duration));
    }

    /// Makes reads fail with `BrokenPipe` once the script runs out.
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    /// Makes the next `connect` fail.
    pub fn fail_next_open(&self, kind: ErrorKind) {
        self.lock().open_error = Some(kind);
    }

    /// Caps the number of bytes accepted per write.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.lock().write_limit = limit;
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Takes and clears everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    /// How many times pending input was discarded.
    pub fn discard_count(&self) -> usize {
        self.lock().discards
    }

    /// How many transports were opened through a [`MockConnector`].
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    /// True once every scripted entry was consumed.
    pub fn is_drained(&self) -> bool {
        self.lock().inbound.is_empty()
    }
}

/// A transport backed by a [`MockHandle`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    pub fn new(handle: MockHandle) -> Self {
        Self { handle }
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let next = {
            let mut state = self.handle.lock();
            match state.inbound.pop_front() {
                Some(Scripted::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        data.drain(..n);
                        state.inbound.push_front(Scripted::Data(data));
                    }
                    return Ok(n);
                }
                Some(Scripted::Fail(kind)) => return Err(io::Error::new(kind, "scripted failure")),
                Some(Scripted::Pause(duration)) => duration,
                None if state.disconnected => {
                    return Err(io::Error::new(ErrorKind::BrokenPipe, "device disconnected"));
                }
                None => IDLE_READ,
            }
        };

        thread::sleep(next);
        Err(io::Error::new(ErrorKind::TimedOut, "no data"))
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.handle.lock();
        if state.disconnected {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "device disconnected"));
        }
        let n = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn discard_input(&mut self) -> io::Result<()> {
        let mut state = self.handle.lock();
        state.discards += 1;
        state
            .inbound
            .retain(|entry| !matches!(entry, Scripted::Data(_)));
        Ok(())
    }

    fn try_clone_transport(&self) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(self.clone()))
    }
}

/// Connector handing out [`MockTransport`]s bound to one handle.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    handle: MockHandle,
}

impl MockConnector {
    pub fn new(handle: MockHandle) -> Self {
        Self { handle }
    }

    /// The handle shared by every transport this connector opens.
    pub fn handle(&self) -> &MockHandle {
        &self.handle
    }
}

impl Connector for MockConnector {
    fn connect(&self, _settings: &PortSettings) -> PortResult<Box<dyn Transport>> {
        let mut state = self.handle.lock();
        if let Some(kind) = state.open_error.take() {
            return Err(io::Error::new(kind, "scripted open failure").into());
        }
        state.opens += 1;
        drop(state);
        Ok(Box::new(MockTransport::new(self.handle.clone())))
    }
}
