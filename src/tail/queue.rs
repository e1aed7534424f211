// SPDX-License-Identifier: Apache-2.0

//! Ordered queue of files waiting to be tailed.
//!
//! The front entry is the file the tail loop has open (or is about to open).
//! The notifier appends, the tail loop peeks and pops. Every operation holds
//! the lock only for the list mutation itself.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct PendingFileQueue {
    paths: Mutex<VecDeque<PathBuf>>,
}

impl PendingFileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue holding `paths` in order, collapsing consecutive duplicates.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let queue = Self::new();
        for path in paths {
            queue.enqueue(path);
        }
        queue
    }

    /// Append `path` unless it equals the current last entry.
    ///
    /// Only the last entry is compared: a path that reappears after other
    /// paths were queued behind it is appended again. Returns whether the
    /// path was appended.
    pub fn enqueue(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let mut paths = self.lock();
        if paths.back() == Some(&path) {
            return false;
        }
        paths.push_back(path);
        true
    }

    /// The first path, if any
    pub fn peek_front(&self) -> Option<PathBuf> {
        self.lock().front().cloned()
    }

    /// Remove and return the first path.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Only the tail loop pops, and only after
    /// it has seen the entry at the front, so an empty queue here means the
    /// queue and the open file have diverged.
    pub fn pop_front(&self) -> PathBuf {
        match self.lock().pop_front() {
            Some(path) => path,
            None => panic!("pop_front on an empty pending file queue"),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current entries, front first
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }

    // No operation can leave the list half-mutated, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
