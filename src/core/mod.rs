//! Core bridge functionality
//!
//! - Line configuration decoding (`line_config`)
//! - Terminal attribute capture/apply/restore (`term_mode`)
//! - The poll(2)-driven relay loop (`relay`)
//! - Cleanup and signal routing (`lifecycle`)

pub mod lifecycle;
pub mod line_config;
pub mod relay;
pub mod term_mode;

use std::fmt;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use self::line_config::ConfigField;

/// One end of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The serial device.
    Device,
    /// The process's standard input.
    Stdin,
    /// The process's standard output.
    Stdout,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "serial device"),
            Self::Stdin => write!(f, "stdin"),
            Self::Stdout => write!(f, "stdout"),
        }
    }
}

/// Bridge error types
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The configuration token is malformed at the named field.
    #[error("invalid {0} in line configuration")]
    InvalidConfig(ConfigField),

    /// The device path could not be opened.
    #[error("could not open '{}'", .path.display())]
    DeviceOpen {
        /// Path the open attempt was made on.
        path: PathBuf,
        /// Underlying system error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing terminal attributes failed.
    #[error("cannot access terminal attributes of {endpoint}")]
    TermAttrs {
        /// Endpoint whose attributes were touched.
        endpoint: Endpoint,
        /// Underlying system error.
        #[source]
        source: Errno,
    },

    /// An unrecoverable read or write failure on an endpoint.
    #[error("{op} on {endpoint} failed")]
    Io {
        /// Endpoint the operation ran against.
        endpoint: Endpoint,
        /// Short name of the failed operation.
        op: &'static str,
        /// Underlying system error.
        #[source]
        source: Errno,
    },

    /// The multiplexer reported a hang-up or error condition on an endpoint.
    #[error("{0} hung up")]
    EndpointClosed(Endpoint),
}
