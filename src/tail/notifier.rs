// SPDX-License-Identifier: Apache-2.0

//! Turns watcher events into pending files.
//!
//! The notifier runs on its own thread. Each batch of events from the watcher
//! is filtered down to changed paths in the watched directory that match the
//! filter, each such path is offered to the pending queue, and the tail loop
//! is woken. The watcher is not read again until the batch is handled, so a
//! burst of duplicate events for one change lands in the next batch, where
//! the queue's last-entry dedup absorbs it.
//!
//! A watcher error is fatal. The notifier stops, raises the shared stop
//! flag so the tail loop exits, and returns the error for the owner to
//! report.
//!
//! The watcher outlives a run: the thread hands it back on exit so changes
//! made while the tailer is stopped are reported on the next run.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error};

use crate::tail::finder::FileFinder;
use crate::tail::queue::PendingFileQueue;
use crate::tail::watcher::{BoxedWatcher, FileEvent, WatcherError};
use crate::wake::WakeSignal;

/// Join handle of the notifier thread
pub type NotifierHandle = JoinHandle<(BoxedWatcher, Result<(), WatcherError>)>;

pub struct ChangeNotifier {
    finder: FileFinder,
    queue: Arc<PendingFileQueue>,
    wake: WakeSignal,
}

impl ChangeNotifier {
    pub fn new(finder: FileFinder, queue: Arc<PendingFileQueue>, wake: WakeSignal) -> Self {
        Self {
            finder,
            queue,
            wake,
        }
    }

    /// Handle one batch of events. Returns the number of paths appended to the queue.
    ///
    /// The tail loop is woken whenever any matching path changed, even if the
    /// path was already last in the queue: the file it is parked on may have
    /// grown.
    pub fn handle_batch(&self, events: &[FileEvent]) -> usize {
        let mut previous: Option<&Path> = None;
        let mut signalled = false;
        let mut enqueued = 0;

        for path in events.iter().flat_map(|e| e.changed_paths()) {
            if previous == Some(path.as_path()) {
                continue;
            }
            previous = Some(path.as_path());

            if !self.finder.matches(path) || path.is_dir() {
                continue;
            }

            signalled = true;
            if self.queue.enqueue(path.clone()) {
                enqueued += 1;
                debug!(path = %path.display(), pending = self.queue.len(), "Queued file");
            }
        }

        if signalled {
            self.wake.notify();
        }

        enqueued
    }

    /// Pump events from `watcher` until `stop` is raised or the watcher fails.
    pub fn run(
        &self,
        watcher: &mut BoxedWatcher,
        stop: &AtomicBool,
        recv_timeout: Duration,
    ) -> Result<(), WatcherError> {
        while !stop.load(Ordering::SeqCst) {
            let events = watcher.recv_timeout(recv_timeout)?;
            if !events.is_empty() {
                self.handle_batch(&events);
            }
        }
        Ok(())
    }

    /// Run on a dedicated thread, returning the watcher when the thread exits.
    /// On failure the stop flag is raised and the tail loop woken before the
    /// thread returns the error.
    pub fn spawn(
        self,
        mut watcher: BoxedWatcher,
        stop: Arc<AtomicBool>,
        recv_timeout: Duration,
    ) -> std::io::Result<NotifierHandle> {
        std::thread::Builder::new()
            .name("logtrail-notifier".to_string())
            .spawn(move || {
                debug!(backend = watcher.backend_name(), "Change notifier started");
                let result = self.run(&mut watcher, &stop, recv_timeout);
                if let Err(ref e) = result {
                    error!(error = %e, "Change notification failed, stopping tailer");
                    stop.store(true, Ordering::SeqCst);
                    self.wake.notify();
                }
                (watcher, result)
            })
    }
}
