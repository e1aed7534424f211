// SPDX-License-Identifier: Apache-2.0

//! Single-slot wake signal.
//!
//! Backed by a flume channel of capacity one: signalling while a wake is
//! already pending is a no-op, so any number of signals delivered before the
//! waiter observes them collapse into a single wake. Receiving consumes the
//! slot, which resets the signal.

use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Result of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The signal was set
    Signalled,
    /// The timeout elapsed first
    TimedOut,
}

#[derive(Clone)]
pub struct WakeSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl WakeSignal {
    pub fn new() -> Self {
        let (tx, rx) = flume::bounded(1);
        Self { tx, rx }
    }

    /// Set the signal. Never blocks.
    pub fn notify(&self) {
        // Full means a wake is already pending. Both halves live in self, so
        // the channel never disconnects.
        if let Err(TrySendError::Full(())) = self.tx.try_send(()) {
            tracing::trace!("wake already pending");
        }
    }

    /// Block until the signal is set or `timeout` elapses, resetting it.
    pub fn wait_timeout(&self, timeout: Duration) -> Wake {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Wake::Signalled,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Wake::TimedOut,
        }
    }

    /// Whether a wake is pending
    pub fn is_set(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}
