// SPDX-License-Identifier: Apache-2.0

//! Traits and types for file system watchers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for watcher operations
#[derive(Debug)]
pub enum WatcherError {
    /// Failed to initialize the watcher
    Init(String),
    /// Failed to watch a path
    Watch(String),
    /// The backend reported a failure while delivering events
    Backend(String),
    /// IO error
    Io(std::io::Error),
    /// Channel error
    Channel(String),
}

impl fmt::Display for WatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherError::Init(msg) => write!(f, "watcher initialization failed: {}", msg),
            WatcherError::Watch(msg) => write!(f, "watch failed: {}", msg),
            WatcherError::Backend(msg) => write!(f, "watcher backend error: {}", msg),
            WatcherError::Io(e) => write!(f, "IO error: {}", e),
            WatcherError::Channel(msg) => write!(f, "channel error: {}", msg),
        }
    }
}

impl std::error::Error for WatcherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatcherError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WatcherError {
    fn from(e: std::io::Error) -> Self {
        WatcherError::Io(e)
    }
}

/// Kind of file event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created
    Create,
    /// File was modified (content changed)
    Modify,
    /// File was removed/deleted
    Remove,
    /// File was renamed (paths are old then new)
    Rename,
    /// Catch-all for other events
    Other,
}

/// A file system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The kind of event
    pub kind: FileEventKind,
    /// The path(s) affected by the event
    pub paths: Vec<PathBuf>,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    pub fn create(path: PathBuf) -> Self {
        Self::new(FileEventKind::Create, vec![path])
    }

    pub fn modify(path: PathBuf) -> Self {
        Self::new(FileEventKind::Modify, vec![path])
    }

    pub fn remove(path: PathBuf) -> Self {
        Self::new(FileEventKind::Remove, vec![path])
    }

    pub fn rename(from: PathBuf, to: PathBuf) -> Self {
        Self::new(FileEventKind::Rename, vec![from, to])
    }

    /// Paths whose content may now hold unread data.
    ///
    /// Removals yield nothing, renames yield only the destination.
    pub fn changed_paths(&self) -> &[PathBuf] {
        match self.kind {
            FileEventKind::Remove => &[],
            FileEventKind::Rename => self.paths.last().map(std::slice::from_ref).unwrap_or(&[]),
            FileEventKind::Create | FileEventKind::Modify | FileEventKind::Other => &self.paths,
        }
    }
}

/// Trait for file system watchers.
///
/// Implementations can use native OS file system notifications or polling.
/// Any error returned from a receive call means the watcher can no longer
/// be trusted to report changes.
pub trait FileWatcher {
    /// Add a directory to watch (non-recursive)
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError>;

    /// Return any pending events immediately, or an empty vector.
    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError>;

    /// Block until events are available or the timeout expires.
    ///
    /// Returns an empty vector if the timeout expires with no events.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError>;

    /// Returns true for inotify/kqueue/FSEvents watchers, false for poll watchers.
    fn is_native(&self) -> bool;

    /// Get the name of the watcher backend for logging.
    fn backend_name(&self) -> &'static str;
}
