//! Command-line surface
//!
//! `ttybridge [-e] [-c] <device> <config>` — two flags, a device path and
//! a line configuration token. Everything else the program needs is decoded
//! from the token.

use std::path::PathBuf;

use clap::Parser;

const CONFIG_HELP: &str = "\
<config> sets baud rate, parity, data bits, stop bits and flow control, e.g.:
  9600n81h  (9600 baud, no parity, 8 data bits, 1 stop bit, hw flow control)
     ||||`- flow control (h - hardware cts/rts, s - software xon/xoff,
     ||||                 omit for no flow control)
     |||`-- stop bits    (1 or 2)
     ||`--- data bits    (5, 6, 7 or 8)
     |`---- parity bit   (n - no parity, e - even parity, o - odd parity)
     `----- baud rate    (50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800,
                          2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400)";

/// A minimal serial terminal bridge between a tty device and stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "ttybridge", version, about, after_help = CONFIG_HELP)]
pub struct Cli {
    /// Echo all input from stdin to stdout
    #[arg(short = 'e')]
    pub echo: bool,

    /// Keep stdin in canonical mode (read whole lines rather than single
    /// characters)
    #[arg(short = 'c')]
    pub canonical: bool,

    /// The console to use (e.g. /dev/ttyS0)
    pub device: PathBuf,

    /// Line configuration token (e.g. 9600n81h)
    pub config: String,
}
