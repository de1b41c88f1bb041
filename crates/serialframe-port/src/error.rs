//! Port error types.

use std::io;
use thiserror::Error;

use serialframe_protocol::FramingError;

/// Result type for port operations.
pub type PortResult<T> = Result<T, PortError>;

/// Errors that can occur while driving a port.
#[derive(Debug, Error)]
pub enum PortError {
    /// Read, write or flush failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Failure opening or enumerating devices.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Operation needs an open port.
    #[error("port is not open")]
    NotOpen,

    /// `open` called twice.
    #[error("port is already open")]
    AlreadyOpen,

    /// Receive loop already running for this engine.
    #[error("receive loop is already running")]
    AlreadyReceiving,

    /// Setting the transport cannot express.
    #[error("unsupported setting: {setting}")]
    Unsupported { setting: String },

    /// Invalid accumulator bounds.
    #[error("framing configuration error: {0}")]
    Framing(#[from] FramingError),

    /// The receive loop thread panicked.
    #[error("receive loop panicked")]
    LoopPanicked,
}

impl PortError {
    /// Creates an unsupported setting error.
    pub fn unsupported(setting: impl Into<String>) -> Self {
        Self::Unsupported {
            setting: setting.into(),
        }
    }

    /// Returns true for failures coming from the transport itself.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Serial(_))
    }
}
