// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use super::traits::{FileEvent, FileWatcher, WatcherError};

/// Scripted watcher for tests: hands out queued batches in order, then
/// optionally fails.
pub struct MockWatcher {
    batches: VecDeque<Vec<FileEvent>>,
    fail_when_empty: bool,
}

impl MockWatcher {
    pub fn new(batches: Vec<Vec<FileEvent>>) -> Self {
        Self {
            batches: batches.into(),
            fail_when_empty: false,
        }
    }

    /// Deliver `batches`, then fail every later receive
    pub fn fail_after(batches: Vec<Vec<FileEvent>>) -> Self {
        Self {
            batches: batches.into(),
            fail_when_empty: true,
        }
    }

    fn next_batch(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        match self.batches.pop_front() {
            Some(batch) => Ok(batch),
            None if self.fail_when_empty => {
                Err(WatcherError::Backend("mock watcher failure".to_string()))
            }
            None => Ok(Vec::new()),
        }
    }
}

impl FileWatcher for MockWatcher {
    fn watch(&mut self, _path: &Path) -> Result<(), WatcherError> {
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        self.next_batch()
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        if self.batches.is_empty() && !self.fail_when_empty {
            std::thread::sleep(timeout);
        }
        self.next_batch()
    }

    fn is_native(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}
