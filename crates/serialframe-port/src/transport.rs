//! Transport seam and the `serialport` backed implementation.
//!
//! The engines only need a byte pipe: read, write, discard pending input,
//! and a second handle so the receive loop can read while callers write.

use std::io::{self, Read, Write};
use std::time::Duration;

use serde::Serialize;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::{debug, info};

use serialframe_core::{DataBits, Parity, PortSettings, StopBits};

use crate::error::{PortError, PortResult};

/// A raw byte pipe to a device.
///
/// `read` may block up to a transport-defined timeout. `Ok(0)` and
/// `ErrorKind::TimedOut` both mean "nothing yet".
pub trait Transport: Read + Write + Send {
    /// Discards bytes received by the device but not yet read.
    fn discard_input(&mut self) -> io::Result<()>;

    /// Opens a second handle on the same device.
    fn try_clone_transport(&self) -> io::Result<Box<dyn Transport>>;
}

/// Opens transports from port settings.
pub trait Connector: Send + Sync {
    /// Opens the device described by `settings`.
    fn connect(&self, settings: &PortSettings) -> PortResult<Box<dyn Transport>>;
}

/// A real serial device.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wraps an already opened port.
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialTransport {
    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }

    fn try_clone_transport(&self) -> io::Result<Box<dyn Transport>> {
        let port = self.port.try_clone().map_err(io::Error::from)?;
        Ok(Box::new(SerialTransport::new(port)))
    }
}

/// Opens devices through the `serialport` crate.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    /// Read timeout; bounds how long the receive loop waits per read.
    pub read_timeout: Duration,
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(50),
        }
    }
}

impl SerialConnector {
    /// Creates a connector with the given read timeout.
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Connector for SerialConnector {
    fn connect(&self, settings: &PortSettings) -> PortResult<Box<dyn Transport>> {
        let port = serialport::new(&settings.device, settings.baud_rate)
            .data_bits(to_serialport_data_bits(settings.data_bits))
            .parity(to_serialport_parity(settings.parity)?)
            .stop_bits(to_serialport_stop_bits(settings.stop_bits)?)
            .timeout(self.read_timeout)
            .open()?;

        info!(port = %settings, "Opened serial port");
        Ok(Box::new(SerialTransport::new(port)))
    }
}

/// Information about an available serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

/// Enumerates serial devices present on this machine.
pub fn list_ports() -> PortResult<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    debug!(count = ports.len(), "Enumerated serial ports");

    Ok(ports
        .into_iter()
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                SerialPortType::UsbPort(info) => (
                    "usb",
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                SerialPortType::BluetoothPort => ("bluetooth", None, None, None, None, None),
                SerialPortType::PciPort => ("pci", None, None, None, None, None),
                SerialPortType::Unknown => ("unknown", None, None, None, None, None),
            };
            PortInfo {
                port_name: p.port_name,
                port_type: port_type.to_string(),
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect())
}

fn to_serialport_data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn to_serialport_parity(parity: Parity) -> PortResult<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(PortError::unsupported(format!("{:?} parity", parity))),
    }
}

fn to_serialport_stop_bits(stop_bits: StopBits) -> PortResult<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(PortError::unsupported("1.5 stop bits")),
    }
}
