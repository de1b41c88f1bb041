//! Core types: port settings, escaped byte markers, tracing

pub mod escape;
pub mod settings;
pub mod tracing;

pub use escape::{format_escaped, parse_escaped};
pub use settings::{DataBits, Parity, PortSettings, SettingsError, StopBits};
pub use tracing::{LogFormat, TracingConfig, TracingError, init_tracing};
