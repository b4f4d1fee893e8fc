//! Signal handling: SIGTERM/SIGINT → cooperative simulation stop.
//!
//! Uses the `signal-hook` crate for safe signal registration. The CLI run
//! loop polls [`ShutdownSignal`] each tick rather than blocking on signals.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Thread-safe shutdown flag shared between the signal handler and the
/// run loop.
///
/// The flag uses `Ordering::Relaxed` because the loop polls it every tick
/// and exact ordering with other atomics is not required.
#[derive(Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create the flag and register OS signal hooks.
    ///
    /// SIGTERM/SIGINT -> shutdown. Registration is best-effort; failures
    /// are logged to stderr but not fatal.
    #[must_use]
    pub fn new() -> Self {
        let signal = Self {
            flag: Arc::new(AtomicBool::new(false)),
        };
        signal.register();
        signal
    }

    /// Whether a shutdown has been requested.
    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown (e.g. after a bounded run).
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    fn register(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.flag)) {
            eprintln!("[APL-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.flag)) {
            eprintln!("[APL-SIGNAL] failed to register SIGINT: {e}");
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
