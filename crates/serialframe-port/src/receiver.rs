//! On-demand frame extraction over a background receive loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use serialframe_core::PortSettings;
use serialframe_protocol::{Frame, FramingConfig, encode_line};

use crate::error::{PortError, PortResult};
use crate::line::LineIo;
use crate::receive::{self, ReceiveHandle};
use crate::shared::Shared;
use crate::transport::{Connector, SerialConnector, Transport};

/// Receiver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Accumulator bounds and read size.
    pub framing: FramingConfig,
    /// Appended to every write. Empty sends payloads verbatim.
    pub terminator: Vec<u8>,
    /// Leading bytes stripped by [`LineIo::read_line`].
    pub leading: Vec<u8>,
    /// Boundary used by [`LineIo::read_line`].
    pub boundary: Vec<u8>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            framing: FramingConfig::default(),
            terminator: Vec::new(),
            leading: b"\r\n".to_vec(),
            boundary: b"\r".to_vec(),
        }
    }
}

/// A port whose received bytes are framed on demand.
///
/// Typical use: [`open`](Self::open), [`start`](Self::start), then poll
/// [`extract_frame`](Self::extract_frame) (or block in
/// [`wait_frame`](Self::wait_frame)) while writing with
/// [`write`](Self::write) from any thread.
pub struct Receiver {
    settings: PortSettings,
    connector: Arc<dyn Connector>,
    config: ReceiverConfig,
    writer: Mutex<Option<Box<dyn Transport>>>,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
}

impl Receiver {
    /// Creates a receiver for a real serial device.
    pub fn new(settings: PortSettings) -> Self {
        Self::with_connector(settings, SerialConnector::default())
    }

    /// Creates a receiver opening its transport through `connector`.
    pub fn with_connector(settings: PortSettings, connector: impl Connector + 'static) -> Self {
        let config = ReceiverConfig::default();
        Self {
            shared: Arc::new(Shared::new(&config.framing)),
            settings,
            connector: Arc::new(connector),
            config,
            writer: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ReceiverConfig) -> Self {
        {
            let mut state = self.shared.lock();
            state.accumulator.set_capacity(config.framing.capacity);
            state.accumulator.set_idle_timeout(config.framing.idle_timeout);
        }
        self.config = config;
        self
    }

    /// Port settings this receiver opens.
    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// Current configuration.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Sets the idle gap after which buffered bytes are dropped. Zero disables it.
    pub fn set_idle_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.framing = self.config.framing.clone().with_idle_timeout(timeout);
        self.shared
            .lock()
            .accumulator
            .set_idle_timeout(self.config.framing.idle_timeout);
        self
    }

    /// Sets the accumulator capacity. Applies to a running loop at once.
    ///
    /// A capacity below the chunk size makes the next `start` fail. On a
    /// loop that is already running, any longer chunk keeps only its last
    /// `capacity` bytes.
    pub fn set_capacity(&mut self, capacity: usize) -> &mut Self {
        if capacity < self.config.framing.chunk_size {
            warn!(
                capacity,
                chunk_size = self.config.framing.chunk_size,
                "Capacity below chunk size, long reads will be truncated"
            );
        }
        self.config.framing.capacity = capacity;
        self.shared.lock().accumulator.set_capacity(capacity);
        self
    }

    /// Sets the size of each transport read. Applies from the next start.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> &mut Self {
        self.config.framing.chunk_size = chunk_size;
        self
    }

    /// Sets the bytes appended to every write.
    pub fn set_terminator(&mut self, terminator: impl Into<Vec<u8>>) -> &mut Self {
        self.config.terminator = terminator.into();
        self
    }

    /// Sets the leading bytes and boundary used by [`LineIo::read_line`].
    pub fn set_line_format(
        &mut self,
        leading: impl Into<Vec<u8>>,
        boundary: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.config.leading = leading.into();
        self.config.boundary = boundary.into();
        self
    }

    fn writer(&self) -> MutexGuard<'_, Option<Box<dyn Transport>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the transport.
    pub fn open(&self) -> PortResult<()> {
        let mut writer = self.writer();
        if writer.is_some() {
            return Err(PortError::AlreadyOpen);
        }
        *writer = Some(self.connector.connect(&self.settings)?);
        info!(port = %self.settings, "Receiver opened");
        Ok(())
    }

    /// Returns true between a successful `open` and `close`.
    pub fn is_open(&self) -> bool {
        self.writer().is_some()
    }

    /// Stops the receive loop and closes the transport.
    pub fn close(&self) -> PortResult<()> {
        self.stop.store(true, Ordering::Release);
        match self.writer().take() {
            Some(_) => {
                info!(port = %self.settings, "Receiver closed");
                Ok(())
            }
            None => Err(PortError::NotOpen),
        }
    }

    /// Writes `payload` followed by the terminator.
    ///
    /// Returns the byte count the transport accepted; a short write is
    /// reported as is and not retried.
    pub fn write(&self, payload: &[u8]) -> PortResult<usize> {
        let mut writer = self.writer();
        let transport = writer.as_mut().ok_or(PortError::NotOpen)?;
        let data = encode_line(payload, &self.config.terminator);
        let written = transport.write(&data)?;
        debug!(len = data.len(), written, "Wrote payload");
        Ok(written)
    }

    /// Starts the receive loop on a background thread.
    pub fn start(&self) -> PortResult<ReceiveHandle> {
        let transport = self.prepare_loop()?;
        receive::spawn_loop(
            transport,
            self.shared.clone(),
            self.config.framing.chunk_size,
            self.stop.clone(),
        )
    }

    /// Runs the receive loop on the calling thread until it stops.
    pub fn run(&self) -> PortResult<()> {
        let transport = self.prepare_loop()?;
        receive::run_loop(transport, &self.shared, self.config.framing.chunk_size, &self.stop)
    }

    fn prepare_loop(&self) -> PortResult<Box<dyn Transport>> {
        self.config.framing.validate()?;

        let mut reader = {
            let writer = self.writer();
            let transport = writer.as_ref().ok_or(PortError::NotOpen)?;
            transport.try_clone_transport()?
        };

        {
            let mut state = self.shared.lock();
            if state.running {
                return Err(PortError::AlreadyReceiving);
            }
            state.running = true;
            state.accumulator.clear();
        }

        if let Err(e) = reader.discard_input() {
            warn!(error = %e, "Failed to discard pending input");
        }
        self.stop.store(false, Ordering::Release);
        Ok(reader)
    }

    /// Returns true while the receive loop runs.
    pub fn is_receiving(&self) -> bool {
        self.shared.lock().running
    }

    /// Number of bytes buffered and not yet framed.
    pub fn buffered(&self) -> usize {
        self.shared.lock().accumulator.len()
    }

    /// Returns the next complete frame, or `None` if there is none yet.
    ///
    /// Leading bytes in `leading` are stripped one at a time, in any order.
    /// The frame is everything before the first `boundary`; the boundary
    /// stays buffered. A boundary at the very front yields `None`.
    pub fn extract_frame(&self, leading: &[u8], boundary: &[u8]) -> Option<Frame> {
        self.shared.lock().accumulator.extract_frame(leading, boundary)
    }

    /// Like [`extract_frame`](Self::extract_frame), but waits up to
    /// `timeout` for a frame while the receive loop runs.
    pub fn wait_frame(&self, leading: &[u8], boundary: &[u8], timeout: Duration) -> Option<Frame> {
        self.shared.wait_for(timeout, |state| {
            state.accumulator.extract_frame(leading, boundary)
        })
    }
}

impl LineIo for Receiver {
    fn write_line(&self, line: &[u8]) -> PortResult<usize> {
        self.write(line)
    }

    fn read_line(&self) -> Option<Frame> {
        self.extract_frame(&self.config.leading, &self.config.boundary)
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockHandle};
    use std::io::ErrorKind;
    use std::thread;
    use std::time::Instant;

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn mock_receiver() -> (Receiver, MockHandle) {
        let handle = MockHandle::new();
        let receiver = Receiver::with_connector(
            PortSettings::new("mock", 9600),
            MockConnector::new(handle.clone()),
        );
        (receiver, handle)
    }

    #[test]
    fn write_before_open_fails() {
        let (receiver, _) = mock_receiver();
        assert!(matches!(receiver.write(b"AT"), Err(PortError::NotOpen)));
        assert!(matches!(receiver.start(), Err(PortError::NotOpen)));
        assert!(matches!(receiver.close(), Err(PortError::NotOpen)));
    }

    #[test]
    fn open_twice_fails() {
        let (receiver, _) = mock_receiver();
        receiver.open().unwrap();
        assert!(matches!(receiver.open(), Err(PortError::AlreadyOpen)));
        assert!(receiver.is_open());
    }

    #[test]
    fn write_appends_terminator() {
        let (mut receiver, handle) = mock_receiver();
        receiver.set_terminator(b"\r\n".to_vec());
        receiver.open().unwrap();

        assert_eq!(receiver.write(b"PING").unwrap(), 6);
        assert_eq!(handle.written(), b"PING\r\n");
    }

    #[test]
    fn write_without_terminator_is_verbatim() {
        let (receiver, handle) = mock_receiver();
        receiver.open().unwrap();
        receiver.write(b"AT").unwrap();
        assert_eq!(handle.written(), b"AT");
    }

    #[test]
    fn partial_write_is_reported() {
        let (mut receiver, handle) = mock_receiver();
        receiver.set_terminator(b"\r\n".to_vec());
        receiver.open().unwrap();
        handle.set_write_limit(Some(4));
        assert_eq!(receiver.write(b"PING").unwrap(), 4);
    }

    #[test]
    fn start_rejects_invalid_framing() {
        let (mut receiver, _) = mock_receiver();
        receiver.set_capacity(16).set_chunk_size(32);
        receiver.open().unwrap();
        assert!(matches!(receiver.start(), Err(PortError::Framing(_))));
        assert!(!receiver.is_receiving());
    }

    #[test]
    fn start_twice_fails() {
        let (receiver, _) = mock_receiver();
        receiver.open().unwrap();
        let handle = receiver.start().unwrap();
        assert!(matches!(receiver.start(), Err(PortError::AlreadyReceiving)));
        handle.stop();
        handle.join().unwrap();
    }

    #[test]
    fn start_discards_pending_input() {
        let (receiver, handle) = mock_receiver();
        receiver.open().unwrap();
        handle.push_read(b"stale\r".to_vec());

        let rx = receiver.start().unwrap();
        assert_eq!(handle.discard_count(), 1);
        assert!(receiver.wait_frame(b"\r\n", b"\r", Duration::from_millis(30)).is_none());

        rx.stop();
        rx.join().unwrap();
    }

    #[test]
    fn extract_before_start_is_none() {
        let (receiver, _) = mock_receiver();
        assert!(receiver.extract_frame(b"\r\n", b"\r").is_none());
        assert!(receiver.wait_frame(b"\r\n", b"\r", Duration::from_secs(5)).is_none());
    }

    #[test]
    fn run_blocks_until_transport_fails() {
        let (receiver, handle) = mock_receiver();
        receiver.open().unwrap();

        thread::scope(|s| {
            let looping = s.spawn(|| receiver.run());
            wait_until(|| handle.discard_count() == 1);
            assert!(receiver.is_receiving());

            handle.push_read(b"\r\nPARTIAL".to_vec());
            wait_until(|| receiver.buffered() > 0);
            handle.push_failure(ErrorKind::BrokenPipe);

            let result = looping.join().unwrap();
            assert!(matches!(result, Err(PortError::Transport(ref e)) if e.kind() == ErrorKind::BrokenPipe));
        });

        assert_eq!(receiver.buffered(), 0);
        assert!(!receiver.is_receiving());
        assert!(receiver.is_open());
    }

    #[test]
    fn run_requires_open_port() {
        let (receiver, _) = mock_receiver();
        assert!(matches!(receiver.run(), Err(PortError::NotOpen)));
    }

    #[test]
    fn shrinking_capacity_while_running_keeps_chunk_tail() {
        let (mut receiver, handle) = mock_receiver();
        receiver.open().unwrap();
        let rx = receiver.start().unwrap();

        receiver.set_capacity(4);
        assert_eq!(receiver.config().framing.capacity, 4);
        handle.push_read(b"\r\nABCDEFGH\r".to_vec());
        wait_until(|| receiver.buffered() > 0);
        assert_eq!(receiver.extract_frame(b"\r\n", b"\r").unwrap().as_bytes(), b"FGH");

        rx.stop();
        rx.join().unwrap();
        assert!(matches!(receiver.start(), Err(PortError::Framing(_))));
    }

    #[test]
    fn setters_update_config() {
        let (mut receiver, _) = mock_receiver();
        receiver
            .set_idle_timeout(Duration::from_secs(5))
            .set_capacity(4096)
            .set_chunk_size(512)
            .set_terminator(b"\r\n".to_vec())
            .set_line_format(b"\n".to_vec(), b"\r\n".to_vec());

        let config = receiver.config();
        assert_eq!(config.framing.idle_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.framing.capacity, 4096);
        assert_eq!(config.framing.chunk_size, 512);
        assert_eq!(config.terminator, b"\r\n");
        assert_eq!(config.leading, b"\n");
        assert_eq!(config.boundary, b"\r\n");
    }
}
