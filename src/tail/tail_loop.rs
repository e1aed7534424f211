// SPDX-License-Identifier: Apache-2.0

//! The background tail loop.
//!
//! The loop owns the open file and its splitter. It drains the file at the
//! front of the pending queue until a read returns no data, then either parks
//! on the wake signal (the file is the only one pending) or retires the file
//! and moves to the next one (a newer file is queued behind it). Files are
//! drained strictly one at a time, in queue order.
//!
//! Parking is bounded: `idle_wait` with nothing pending, `active_wait` on the
//! only pending file. The stop flag is checked after every wait and between
//! records, so a stop request is observed within `active_wait` at worst.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::tail::error::{Error, Result};
use crate::tail::events::{LifecycleEvent, LifecycleEventBus};
use crate::tail::queue::PendingFileQueue;
use crate::tail::sink::RecordSink;
use crate::tail::splitter::RecordSplitter;
use crate::wake::{Wake, WakeSignal};

/// Where the loop is, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailState {
    /// Nothing pending
    Idle,
    /// Reading the front file
    Tailing,
    /// Parked on the only pending file
    WaitingSingle,
}

/// Timing and sizing for the loop
#[derive(Debug, Clone, Copy)]
pub struct TailLoopConfig {
    pub idle_wait: Duration,
    pub active_wait: Duration,
    pub chunk_size: usize,
}

/// An open file and the splitter that has seen all of its bytes so far
struct ActiveFile {
    path: PathBuf,
    file: File,
    splitter: RecordSplitter,
}

/// What a drain of the active file ended with
enum Drained {
    /// The file returned no more data
    Caught,
    /// The stop flag was raised mid-drain
    Interrupted,
}

pub struct TailLoop {
    queue: Arc<PendingFileQueue>,
    wake: WakeSignal,
    stop: Arc<AtomicBool>,
    events: Arc<LifecycleEventBus>,
    sink: Box<dyn RecordSink>,
    config: TailLoopConfig,
    session: Option<ActiveFile>,
    state: TailState,
}

impl TailLoop {
    pub fn new(
        queue: Arc<PendingFileQueue>,
        wake: WakeSignal,
        stop: Arc<AtomicBool>,
        events: Arc<LifecycleEventBus>,
        sink: Box<dyn RecordSink>,
        config: TailLoopConfig,
    ) -> Self {
        Self {
            queue,
            wake,
            stop,
            events,
            sink,
            config,
            session: None,
            state: TailState::Idle,
        }
    }

    /// Run until the stop flag is raised or a sink or listener fails.
    ///
    /// Returns the sink so a later run can reuse it. The open file, if any,
    /// is closed on exit.
    pub fn run(mut self) -> (Box<dyn RecordSink>, Result<()>) {
        let result = self.run_inner();
        if let Some(active) = self.session.take() {
            debug!(path = %active.path.display(), "Closing file");
        }
        match &result {
            Ok(()) => info!(last_state = ?self.state, "Tail loop stopped"),
            Err(e) => warn!(last_state = ?self.state, error = %e, "Tail loop failed"),
        }
        (self.sink, result)
    }

    fn run_inner(&mut self) -> Result<()> {
        loop {
            if self.stopping() {
                return Ok(());
            }

            let Some(front) = self.queue.peek_front() else {
                self.state = TailState::Idle;
                self.park(self.config.idle_wait);
                continue;
            };

            if self.session.as_ref().map(|s| s.path.as_path()) != Some(front.as_path())
                && !self.open(front)?
            {
                continue;
            }

            self.state = TailState::Tailing;
            if let Drained::Interrupted = self.drain()? {
                return Ok(());
            }

            if self.queue.len() > 1 {
                self.rotate()?;
                continue;
            }

            self.state = TailState::WaitingSingle;
            self.park(self.config.active_wait);
        }
    }

    /// Open `path` as the active file. Returns false if it could not be opened.
    fn open(&mut self, path: PathBuf) -> Result<bool> {
        match open_shared(&path) {
            Ok(file) => {
                info!(path = %path.display(), "Started tailing file");
                self.session = Some(ActiveFile {
                    path: path.clone(),
                    file,
                    splitter: RecordSplitter::with_chunk_size(self.config.chunk_size),
                });
                self.events
                    .emit(&LifecycleEvent::FileStarted(path))
                    .map_err(Error::Listener)?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.queue.len() > 1 => {
                // Gone before it was ever read, and something newer is waiting
                warn!(path = %path.display(), "Skipping file removed before it was opened");
                self.queue.pop_front();
                Ok(false)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "File not available yet, retrying");
                self.park(self.config.idle_wait);
                Ok(false)
            }
        }
    }

    /// Forward every complete record currently readable from the active file
    fn drain(&mut self) -> Result<Drained> {
        let Some(active) = self.session.as_mut() else {
            return Ok(Drained::Caught);
        };

        let mut forwarded = 0usize;
        for record in active.splitter.drain(&mut active.file) {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    // Busy or locked reads count as "no data yet"
                    warn!(path = %active.path.display(), error = %e, "Read failed, will retry");
                    break;
                }
            };

            self.sink.accept(record).map_err(Error::Sink)?;
            forwarded += 1;

            if self.stop.load(Ordering::SeqCst) {
                return Ok(Drained::Interrupted);
            }
        }

        if forwarded > 0 {
            debug!(path = %active.path.display(), records = forwarded, "Drained file");
        }
        Ok(Drained::Caught)
    }

    /// Retire the front file now that a newer one is queued behind it
    fn rotate(&mut self) -> Result<()> {
        if let Some(active) = self.session.take() {
            if !active.splitter.pending().is_empty() {
                warn!(
                    path = %active.path.display(),
                    bytes = active.splitter.pending().len(),
                    "Dropping unterminated trailing data from completed file"
                );
            }
        }

        let done = self.queue.pop_front();
        info!(path = %done.display(), pending = self.queue.len(), "Completed file");
        self.events
            .emit(&LifecycleEvent::FileCompleted(done))
            .map_err(Error::Listener)
    }

    fn park(&self, timeout: Duration) {
        if self.stopping() {
            return;
        }
        match self.wake.wait_timeout(timeout) {
            Wake::Signalled => debug!(state = ?self.state, "Woken"),
            Wake::TimedOut => debug!(state = ?self.state, "Wait timed out"),
        }
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Open for reading without blocking other processes from writing, renaming,
/// or deleting the file. Reads continue on the handle after a rename or
/// delete.
fn open_shared(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        // FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE
        options.share_mode(0x1 | 0x2 | 0x4);
    }

    options.open(path)
}
