//! Relay engine
//!
//! A single-threaded byte pump between the serial device and the process's
//! stdin/stdout, driven by poll(2) with no timeout. Device-bound bytes go
//! through a fixed outbound buffer that is never refilled from stdin until
//! fully drained, so a slow or flow-controlled line cannot reorder or drop
//! input. Device-to-host bytes are written straight through to stdout.

use std::os::fd::{AsFd, AsRawFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd;
use tracing::{debug, trace};

use super::{BridgeError, Endpoint};

/// Bytes moved per read on either endpoint.
pub const CHUNK_SIZE: usize = 256;

/// Fixed-capacity buffer for bytes travelling toward the device, with a
/// drain cursor. Refilled only once fully drained.
struct RelayBuffer {
    buf: [u8; CHUNK_SIZE],
    len: usize,
    sent: usize,
}

impl RelayBuffer {
    fn new() -> Self {
        Self {
            buf: [0; CHUNK_SIZE],
            len: 0,
            sent: 0,
        }
    }

    /// Backing storage to read new bytes into. Only valid while drained.
    fn fill(&mut self) -> &mut [u8] {
        debug_assert!(self.is_drained());
        &mut self.buf
    }

    /// Record `len` bytes just read into the buffer and rewind the cursor.
    fn commit(&mut self, len: usize) {
        debug_assert!(len <= CHUNK_SIZE);
        self.len = len;
        self.sent = 0;
    }

    /// Bytes still awaiting delivery to the device.
    fn pending(&self) -> &[u8] {
        &self.buf[self.sent..self.len]
    }

    /// Mark `n` more bytes as delivered.
    fn advance(&mut self, n: usize) {
        self.sent += n;
        debug_assert!(self.sent <= self.len);
    }

    fn is_drained(&self) -> bool {
        self.sent == self.len
    }
}

/// What the relay currently wants from the device descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interest {
    /// Waiting for bytes from the device.
    Read,
    /// Waiting to finish delivering the outbound chunk.
    Write,
}

/// Bidirectional byte pump between a serial device and a stdin/stdout pair.
///
/// Runs until an endpoint hangs up, an unrecoverable I/O error occurs, or
/// the poll is interrupted by a signal. Stdin reaching end-of-file only
/// stops the stdin side; device traffic keeps flowing.
pub struct Relay<D, I, O> {
    device: D,
    input: I,
    output: O,
    outbound: RelayBuffer,
    interest: Interest,
    input_eof: bool,
}

impl<D: AsFd, I: AsFd, O: AsFd> Relay<D, I, O> {
    /// Create a relay over an already configured device and stdio pair.
    pub fn new(device: D, input: I, output: O) -> Self {
        Self {
            device,
            input,
            output,
            outbound: RelayBuffer::new(),
            interest: Interest::Read,
            input_eof: false,
        }
    }

    /// Drive the relay until it terminates.
    ///
    /// A signal-interrupted wait returns `Ok(())`; the lifecycle guard owns
    /// cleanup and the exit status on that path.
    pub fn run(&mut self) -> Result<(), BridgeError> {
        loop {
            let Some((device_events, input_events)) = self.wait()? else {
                debug!("wait interrupted by signal, leaving relay loop");
                return Ok(());
            };
            if !device_events.is_empty() {
                self.device_ready(device_events)?;
            }
            if !input_events.is_empty() {
                self.input_ready(input_events)?;
            }
        }
    }

    /// Block until an endpoint is ready. Returns `None` when the wait was
    /// interrupted by a signal.
    fn wait(&self) -> Result<Option<(PollFlags, PollFlags)>, BridgeError> {
        let device_events = match self.interest {
            Interest::Read => PollFlags::POLLIN,
            Interest::Write => PollFlags::POLLOUT,
        };
        // Stdin only participates while the outbound buffer is drained and
        // has not reached end-of-file.
        let watch_input = !self.input_eof && self.interest == Interest::Read;

        let mut fds = Vec::with_capacity(2);
        fds.push(PollFd::new(self.device.as_fd(), device_events));
        if watch_input {
            fds.push(PollFd::new(self.input.as_fd(), PollFlags::POLLIN));
        }

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(None),
            Err(source) => {
                return Err(BridgeError::Io {
                    endpoint: Endpoint::Device,
                    op: "poll",
                    source,
                })
            }
        }

        let device_revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
        let input_revents = if watch_input {
            fds[1].revents().unwrap_or_else(PollFlags::empty)
        } else {
            PollFlags::empty()
        };
        Ok(Some((device_revents, input_revents)))
    }

    fn device_ready(&mut self, events: PollFlags) -> Result<(), BridgeError> {
        if events.intersects(PollFlags::POLLERR | PollFlags::POLLHUP) {
            return Err(BridgeError::EndpointClosed(Endpoint::Device));
        }
        if events.contains(PollFlags::POLLIN) {
            self.pump_device_to_output()?;
        }
        if events.contains(PollFlags::POLLOUT) {
            self.flush_outbound()?;
        }
        Ok(())
    }

    /// Move one chunk from the device to stdout.
    fn pump_device_to_output(&mut self) -> Result<(), BridgeError> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = match unistd::read(self.device.as_fd().as_raw_fd(), &mut chunk) {
            Ok(0) => return Err(BridgeError::EndpointClosed(Endpoint::Device)),
            Ok(n) => n,
            // Spurious readiness on the non-blocking device.
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => return Ok(()),
            Err(source) => {
                return Err(BridgeError::Io {
                    endpoint: Endpoint::Device,
                    op: "read",
                    source,
                })
            }
        };
        trace!(bytes = n, "device -> stdout");
        write_all(&self.output, &chunk[..n]).map_err(|source| BridgeError::Io {
            endpoint: Endpoint::Stdout,
            op: "write",
            source,
        })
    }

    /// Push pending outbound bytes into the device; back to reading once
    /// the buffer is drained.
    fn flush_outbound(&mut self) -> Result<(), BridgeError> {
        match unistd::write(self.device.as_fd(), self.outbound.pending()) {
            Ok(n) => self.note_delivered(n),
            // Would-block is not an error; wait for the next writability
            // notification.
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => {}
            Err(source) => {
                return Err(BridgeError::Io {
                    endpoint: Endpoint::Device,
                    op: "write",
                    source,
                })
            }
        }
        Ok(())
    }

    /// Account for bytes the device accepted; a partially delivered chunk
    /// keeps the device in write interest, and stdin stays unwatched until
    /// the chunk is drained.
    fn note_delivered(&mut self, n: usize) {
        trace!(bytes = n, "stdin -> device");
        self.outbound.advance(n);
        if self.outbound.is_drained() {
            self.interest = Interest::Read;
        }
    }

    fn input_ready(&mut self, events: PollFlags) -> Result<(), BridgeError> {
        if events.intersects(PollFlags::POLLERR | PollFlags::POLLHUP) {
            return Err(BridgeError::EndpointClosed(Endpoint::Stdin));
        }
        if !events.contains(PollFlags::POLLIN) {
            return Ok(());
        }

        let fd = self.input.as_fd().as_raw_fd();
        let n = match unistd::read(fd, self.outbound.fill()) {
            Ok(n) => n,
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => return Ok(()),
            Err(source) => {
                return Err(BridgeError::Io {
                    endpoint: Endpoint::Stdin,
                    op: "read",
                    source,
                })
            }
        };
        if n == 0 {
            // E.g. a file redirected to stdin ran out. Stop watching stdin
            // but keep relaying device output.
            debug!("stdin reached end-of-file");
            self.input_eof = true;
            return Ok(());
        }

        self.outbound.commit(n);
        self.interest = Interest::Write;
        Ok(())
    }
}

/// Write a full buffer to a blocking descriptor, retrying on interruption.
fn write_all<F: AsFd>(fd: F, mut buf: &[u8]) -> nix::Result<()> {
    while !buf.is_empty() {
        match unistd::write(fd.as_fd(), buf) {
            Ok(0) => return Err(Errno::EIO),
            Ok(n) => buf = &buf[n..],
            Err(Errno::EINTR) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
