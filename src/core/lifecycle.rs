//! Lifecycle and signal handling
//!
//! Every exit path, including SIGINT and SIGTERM, routes through one
//! process-scoped guard that restores the captured terminal snapshots
//! exactly once. Without this, an interrupted session leaves the user's
//! terminal in raw no-echo mode.

use std::io;
use std::os::fd::{AsFd, BorrowedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::termios::Termios;
use tracing::{debug, warn};

use super::{term_mode, Endpoint};

/// Process-scoped cleanup context shared with the signal handler.
///
/// Owns the terminal snapshots captured at startup, stored as plain
/// `libc::termios` so the guard stays `Send + Sync` for the handler
/// thread. `shutdown` is idempotent; whichever of the main path and the
/// signal path gets there first performs the restoration and the other
/// becomes a no-op.
pub struct LifecycleGuard {
    device_fd: RawFd,
    device_saved: libc::termios,
    input_saved: Option<libc::termios>,
    restored: AtomicBool,
}

impl LifecycleGuard {
    /// Build the guard from the device descriptor and the snapshots taken
    /// before reconfiguration. The descriptor must stay open for the rest
    /// of the process's life.
    pub fn new(
        device_fd: RawFd,
        device_saved: Termios,
        input_saved: Option<Termios>,
    ) -> Arc<Self> {
        Arc::new(Self {
            device_fd,
            device_saved: device_saved.into(),
            input_saved: input_saved.map(Into::into),
            restored: AtomicBool::new(false),
        })
    }

    /// Restore stdin first, then the device. Failures are reported and
    /// skipped; restoration always runs to the end.
    pub fn shutdown(&self) {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("restoring terminal state");

        if let Some(saved) = self.input_saved {
            let saved = Termios::from(saved);
            let stdin = io::stdin();
            if let Err(err) = term_mode::restore(stdin.as_fd(), Endpoint::Stdin, &saved) {
                warn!("{err}");
            }
        }

        // The descriptor is owned by main and outlives every caller of
        // shutdown; the process exits right after the signal path runs.
        let saved = Termios::from(self.device_saved);
        let device = unsafe { BorrowedFd::borrow_raw(self.device_fd) };
        if let Err(err) = term_mode::restore(device, Endpoint::Device, &saved) {
            warn!("{err}");
        }
    }
}

/// Route SIGINT and SIGTERM through the guard.
///
/// The handler restores both terminals and exits with success, matching an
/// interactive session being closed on purpose.
pub fn install_signal_handler(guard: Arc<LifecycleGuard>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        guard.shutdown();
        std::process::exit(0);
    })
}
