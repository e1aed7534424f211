// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

use crate::tail::watcher::WatcherError;

/// Boxed error returned by pluggable sinks and listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("Change notification failed: {0}")]
    Watcher(#[from] WatcherError),

    #[error("Record sink failed: {0}")]
    Sink(BoxError),

    #[error("Lifecycle listener failed: {0}")]
    Listener(BoxError),

    #[error("Tailer is running")]
    AlreadyRunning,

    #[error("Tail worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, Error>;
