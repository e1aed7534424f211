// SPDX-License-Identifier: Apache-2.0

//! Configuration for the tailing engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::tail::error::{Error, Result};
use crate::tail::watcher::WatchMode;

/// Default read buffer length in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Configuration for the tailer
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Directory to watch. Only direct children are considered.
    pub directory: PathBuf,
    /// Glob pattern matched against file names (e.g. `*.log`)
    pub filter: String,
    /// How long to park when no file is pending before re-checking
    pub idle_wait: Duration,
    /// How long to park on the only pending file before reading it again
    pub active_wait: Duration,
    /// Number of bytes requested per read
    pub chunk_size: usize,
    /// Watch mode: auto, native, or poll
    pub watch_mode: WatchMode,
    /// Scan interval of the poll backend, also the notifier's receive timeout
    pub poll_interval: Duration,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            filter: "*".to_string(),
            idle_wait: Duration::from_secs(1),
            active_wait: Duration::from_secs(5),
            chunk_size: DEFAULT_CHUNK_SIZE,
            watch_mode: WatchMode::Auto,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl TailConfig {
    /// Create a config for `directory` and `filter` with default timings
    pub fn new(directory: impl Into<PathBuf>, filter: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filter: filter.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(Error::Config("A directory must be specified".to_string()));
        }

        if !self.directory.is_dir() {
            return Err(Error::DirectoryNotFound(self.directory.clone()));
        }

        glob::Pattern::new(&self.filter).map_err(|e| Error::InvalidGlob(e.to_string()))?;

        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be at least 1".to_string()));
        }

        if self.idle_wait.is_zero() || self.active_wait.is_zero() {
            return Err(Error::Config("wait timeouts must be non-zero".to_string()));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be non-zero".to_string()));
        }

        Ok(())
    }
}
