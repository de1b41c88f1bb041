//! Serial transport, background receive loop, and the two framing engines.
//!
//! - [`Receiver`] buffers everything the receive loop reads and hands out
//!   one frame per [`Receiver::extract_frame`] call, with caller-supplied
//!   leading bytes and boundary marker.
//! - [`AtPort`] splits every complete CR-terminated response into a queue
//!   on each [`AtPort::read_line`] call and returns the oldest one.
//!
//! Both poll: `None` means "nothing complete yet, ask again". The
//! `wait_frame` / `read_line_timeout` variants block on a condition
//! variable that the receive loop signals after every read.
//!
//! # Example
//!
//! ```rust,no_run
//! use serialframe_core::PortSettings;
//! use serialframe_port::Receiver;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut receiver = Receiver::new(PortSettings::new("/dev/ttyUSB0", 9600));
//! receiver
//!     .set_terminator(b"\r\n".to_vec())
//!     .set_idle_timeout(Duration::from_secs(5));
//! receiver.open()?;
//! let _handle = receiver.start()?;
//!
//! receiver.write(b"AT+CSQ?")?;
//! if let Some(frame) = receiver.wait_frame(b"\r\n", b"\r", Duration::from_secs(1)) {
//!     println!("Recv {}", frame);
//! }
//! # Ok(())
//! # }
//! ```

mod at;
mod error;
mod line;
pub mod mock;
mod receive;
mod receiver;
mod shared;
mod transport;

pub use at::{AtConfig, AtPort};
pub use error::{PortError, PortResult};
pub use line::LineIo;
pub use mock::{MockConnector, MockHandle, MockTransport};
pub use receive::ReceiveHandle;
pub use receiver::{Receiver, ReceiverConfig};
pub use transport::{Connector, PortInfo, SerialConnector, SerialTransport, Transport, list_ports};

pub use serialframe_protocol::Frame;
