//! Terminal mode control
//!
//! Captures the original termios attributes of the serial device and of
//! stdin before touching either, applies the requested modes, and restores
//! the captured snapshots on the way out. Restoration failures are reported
//! but never fatal; cleanup always runs to completion.

use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::sys::termios::{
    cfmakeraw, cfsetspeed, tcgetattr, tcsetattr, ControlFlags, InputFlags, LocalFlags, SetArg,
    Termios,
};
use tracing::warn;

use super::line_config::{DataBits, FlowControl, LineConfig, Parity, StopBits};
use super::{BridgeError, Endpoint};

/// Requested stdin behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOptions {
    /// Keep canonical (line-buffered) mode instead of dropping to raw reads.
    pub canonical: bool,
    /// Keep the terminal driver's echo of typed characters.
    pub echo: bool,
}

/// Open the serial device read/write without becoming its controlling
/// terminal. Non-blocking, so device writes report would-block instead of
/// stalling the relay.
pub fn open_device(path: &Path) -> Result<File, BridgeError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| BridgeError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// Capture the device's current attributes, then apply the line
/// configuration on top of a raw mode derived from them. Returns the
/// snapshot to restore on exit.
pub fn configure_device<F: AsFd>(fd: F, config: &LineConfig) -> Result<Termios, BridgeError> {
    let saved = tcgetattr(&fd).map_err(|source| BridgeError::TermAttrs {
        endpoint: Endpoint::Device,
        source,
    })?;

    let mut attrs = saved.clone();
    cfmakeraw(&mut attrs);
    apply_line_config(&mut attrs, config).map_err(|source| BridgeError::TermAttrs {
        endpoint: Endpoint::Device,
        source,
    })?;

    tcsetattr(&fd, SetArg::TCSANOW, &attrs).map_err(|source| BridgeError::TermAttrs {
        endpoint: Endpoint::Device,
        source,
    })?;
    Ok(saved)
}

/// Translate a [`LineConfig`] into termios attributes.
///
/// `attrs` is expected to already be in raw mode; residual speed, parity,
/// size, stop and flow bits from the captured state are cleared before the
/// requested ones are set. The device is always told to ignore modem
/// control lines and enable the receiver.
pub(crate) fn apply_line_config(attrs: &mut Termios, config: &LineConfig) -> nix::Result<()> {
    cfsetspeed(attrs, config.baud.speed())?;

    attrs
        .input_flags
        .remove(InputFlags::INPCK | InputFlags::IXON | InputFlags::IXOFF);
    attrs.control_flags.remove(
        ControlFlags::PARENB
            | ControlFlags::PARODD
            | ControlFlags::CSTOPB
            | ControlFlags::CRTSCTS
            | ControlFlags::CSIZE,
    );

    match config.parity {
        Parity::None => {}
        Parity::Even => {
            attrs.input_flags.insert(InputFlags::INPCK);
            attrs.control_flags.insert(ControlFlags::PARENB);
        }
        Parity::Odd => {
            attrs.input_flags.insert(InputFlags::INPCK);
            attrs
                .control_flags
                .insert(ControlFlags::PARENB | ControlFlags::PARODD);
        }
    }

    attrs.control_flags.insert(match config.data_bits {
        DataBits::Five => ControlFlags::CS5,
        DataBits::Six => ControlFlags::CS6,
        DataBits::Seven => ControlFlags::CS7,
        DataBits::Eight => ControlFlags::CS8,
    });

    if config.stop_bits == StopBits::Two {
        attrs.control_flags.insert(ControlFlags::CSTOPB);
    }

    match config.flow_control {
        FlowControl::None => {}
        FlowControl::Hardware => {
            attrs.control_flags.insert(ControlFlags::CRTSCTS);
        }
        FlowControl::Software => {
            attrs.input_flags.insert(InputFlags::IXOFF);
        }
    }

    attrs
        .control_flags
        .insert(ControlFlags::CLOCAL | ControlFlags::CREAD);
    Ok(())
}

/// Capture stdin's current attributes and clear canonical mode and echo
/// unless the options keep them. With both kept, stdin already satisfies
/// the request and is left untouched.
///
/// Attribute failures are reported and swallowed: stdin may be a pipe or a
/// redirected file, which has no terminal attributes to manage. Returns the
/// snapshot, or `None` when nothing was captured.
pub fn configure_input<F: AsFd>(fd: F, options: InputOptions) -> Option<Termios> {
    let saved = match tcgetattr(&fd) {
        Ok(attrs) => attrs,
        Err(err) => {
            warn!("stdin has no terminal attributes ({err}), leaving it alone");
            return None;
        }
    };

    if options.canonical && options.echo {
        return Some(saved);
    }

    let mut attrs = saved.clone();
    if !options.canonical {
        attrs.local_flags.remove(LocalFlags::ICANON);
    }
    if !options.echo {
        attrs.local_flags.remove(LocalFlags::ECHO);
    }
    if let Err(err) = tcsetattr(&fd, SetArg::TCSANOW, &attrs) {
        warn!("could not reconfigure stdin: {err}");
    }
    Some(saved)
}

/// Reapply a captured snapshot to an endpoint.
pub fn restore<F: AsFd>(fd: F, endpoint: Endpoint, saved: &Termios) -> Result<(), BridgeError> {
    tcsetattr(&fd, SetArg::TCSANOW, saved).map_err(|source| BridgeError::TermAttrs {
        endpoint,
        source,
    })
}
