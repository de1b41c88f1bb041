//! Queue-backed engine for AT-style command/response devices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use serialframe_core::PortSettings;
use serialframe_protocol::{AT_BOUNDARY, AT_LEADING, Frame, FramingConfig, encode_line};

use crate::error::{PortError, PortResult};
use crate::line::LineIo;
use crate::receive::{self, ReceiveHandle};
use crate::shared::{Shared, State};
use crate::transport::{Connector, SerialConnector, Transport};

/// AT engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtConfig {
    pub framing: FramingConfig,
    /// Appended to every line written.
    pub suffix: Vec<u8>,
}

impl AtConfig {
    pub fn with_suffix(mut self, suffix: impl Into<Vec<u8>>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

/// An open port whose responses are split on CR into a FIFO queue.
///
/// The receive loop starts as soon as the port is opened. Every
/// [`read_line`](LineIo::read_line) first moves all complete responses
/// from the accumulator into the queue, then pops the oldest.
pub struct AtPort {
    settings: PortSettings,
    suffix: Vec<u8>,
    writer: Mutex<Option<Box<dyn Transport>>>,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<ReceiveHandle>>,
}

impl AtPort {
    /// Opens a serial device with default framing and no suffix.
    pub fn open(settings: PortSettings) -> PortResult<Self> {
        Self::open_with(settings, &SerialConnector::default(), AtConfig::default())
    }

    /// Opens the device through `connector` and starts the receive loop.
    pub fn open_with(
        settings: PortSettings,
        connector: &dyn Connector,
        config: AtConfig,
    ) -> PortResult<Self> {
        config.framing.validate()?;

        let writer = connector.connect(&settings)?;
        let mut reader = writer.try_clone_transport()?;
        if let Err(e) = reader.discard_input() {
            warn!(error = %e, "Failed to discard pending input");
        }

        let shared = Arc::new(Shared::new(&config.framing));
        shared.lock().running = true;
        let stop = Arc::new(AtomicBool::new(false));
        let handle = receive::spawn_loop(
            reader,
            shared.clone(),
            config.framing.chunk_size,
            stop.clone(),
        )?;

        info!(port = %settings, "AT port opened");
        Ok(Self {
            settings,
            suffix: config.suffix,
            writer: Mutex::new(Some(writer)),
            shared,
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// Sets the bytes appended to every line written.
    pub fn set_suffix(&mut self, suffix: impl Into<Vec<u8>>) {
        self.suffix = suffix.into();
    }

    pub fn suffix(&self) -> &[u8] {
        &self.suffix
    }

    fn writer(&self) -> MutexGuard<'_, Option<Box<dyn Transport>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true while the receive loop runs.
    pub fn is_receiving(&self) -> bool {
        self.shared.lock().running
    }

    /// Number of complete responses waiting in the queue.
    pub fn pending(&self) -> usize {
        let mut state = self.shared.lock();
        parse(&mut state);
        state.queue.len()
    }

    /// Like [`read_line`](LineIo::read_line), but waits up to `timeout`
    /// for a response while the receive loop runs.
    pub fn read_line_timeout(&self, timeout: Duration) -> Option<Frame> {
        self.shared.wait_for(timeout, next_frame)
    }

    /// Stops the receive loop and closes the port.
    ///
    /// Returns the read failure that ended the loop, if it stopped on its
    /// own before this call. Queued responses remain readable.
    pub fn close(&self) -> PortResult<()> {
        self.stop.store(true, Ordering::Release);
        if self.writer().take().is_none() {
            return Err(PortError::NotOpen);
        }

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let result = match handle {
            Some(handle) => handle.join(),
            None => Ok(()),
        };
        info!(port = %self.settings, "AT port closed");
        result
    }
}

impl LineIo for AtPort {
    fn write_line(&self, line: &[u8]) -> PortResult<usize> {
        let mut writer = self.writer();
        let transport = writer.as_mut().ok_or(PortError::NotOpen)?;
        let data = encode_line(line, &self.suffix);
        let written = transport.write(&data)?;
        debug!(len = data.len(), written, "Wrote line");
        Ok(written)
    }

    fn read_line(&self) -> Option<Frame> {
        next_frame(&mut self.shared.lock())
    }
}

impl Drop for AtPort {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn parse(state: &mut State) -> usize {
    let State {
        accumulator, queue, ..
    } = state;
    accumulator.drain_frames(AT_LEADING, AT_BOUNDARY, queue)
}

fn next_frame(state: &mut State) -> Option<Frame> {
    parse(state);
    state.queue.pop()
}
