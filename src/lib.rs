//! # ttybridge
//!
//! A minimal serial terminal bridge: opens a serial device, applies a line
//! configuration (baud rate, parity, data bits, stop bits, flow control)
//! and relays bytes bidirectionally between that device and the process's
//! stdin/stdout. Useful for talking to modems, microcontrollers and console
//! servers.
//!
//! The terminal attributes of both the device and stdin are captured before
//! being modified and restored on every exit path, including SIGINT and
//! SIGTERM.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ttybridge::{LineConfig, Relay};
//! use ttybridge::core::term_mode;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config: LineConfig = "115200n81".parse()?;
//!     let device = term_mode::open_device(Path::new("/dev/ttyUSB0"))?;
//!     let saved = term_mode::configure_device(&device, &config)?;
//!
//!     let mut relay = Relay::new(&device, std::io::stdin(), std::io::stdout());
//!     let result = relay.run();
//!
//!     term_mode::restore(&device, ttybridge::Endpoint::Device, &saved)?;
//!     Ok(result?)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod core;

pub use crate::core::line_config::{
    Baud, ConfigField, DataBits, FlowControl, LineConfig, Parity, StopBits,
};
pub use crate::core::relay::{Relay, CHUNK_SIZE};
pub use crate::core::term_mode::InputOptions;
pub use crate::core::{BridgeError, Endpoint};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
