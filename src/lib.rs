//! # Serial Probe
//!
//! A one-shot diagnostic for a JSON-over-serial microcontroller link:
//! 1. Resolves a serial port, either from an explicit path or by probing a
//!    fixed list of candidate devices.
//! 2. Sends the fixed test command and prints the raw, decoded and parsed
//!    forms of whatever comes back.
//! 3. Passively listens for a fixed window and prints any further traffic.
//!
//! **This is an "async-less" crate**: the whole run is synchronous and owns
//! exactly one port handle, which is released on every exit path.

mod config;
mod connection;
mod frame;
mod probe;
mod serial_port;

pub use config::ProbeConfig;
pub use connection::Connection;
pub use frame::Command;
pub use probe::{resolve_port, run};

use thiserror::Error;

/// Failure that ends a probe run early.
///
/// Recoverable per-frame problems (lossy text, malformed JSON lines) are
/// reported inline and never surface here.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No explicit port was given and no candidate could be opened.
    #[error("no working serial port found")]
    NoPortFound,
    /// The test command could not be serialized.
    #[error("command encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// The port failed after it was resolved.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
