// SPDX-License-Identifier: Apache-2.0

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::tail::config::{DEFAULT_CHUNK_SIZE, TailConfig};
use crate::tail::watcher::WatchMode;

/// Watch mode for file system monitoring
#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum WatchModeArg {
    /// Automatically select the best watching strategy (native first, poll fallback)
    #[default]
    Auto,
    /// Force native file system watching (inotify/kqueue/FSEvents)
    Native,
    /// Force polling mode (use for NFS or when native watching is unreliable)
    Poll,
}

impl From<WatchModeArg> for WatchMode {
    fn from(w: WatchModeArg) -> Self {
        match w {
            WatchModeArg::Auto => WatchMode::Auto,
            WatchModeArg::Native => WatchMode::Native,
            WatchModeArg::Poll => WatchMode::Poll,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct TailArgs {
    /// Directory to tail (non-recursive)
    #[arg(long, env = "LOGTRAIL_DIRECTORY")]
    pub directory: PathBuf,

    /// Glob pattern for file names to tail (e.g., "*.log")
    #[arg(long, env = "LOGTRAIL_FILTER", default_value = "*")]
    pub filter: String,

    /// Wait in milliseconds before re-checking when no file is pending
    #[arg(long, env = "LOGTRAIL_IDLE_WAIT_MS", default_value = "1000")]
    pub idle_wait_ms: u64,

    /// Wait in milliseconds before re-reading the only pending file
    #[arg(long, env = "LOGTRAIL_ACTIVE_WAIT_MS", default_value = "5000")]
    pub active_wait_ms: u64,

    /// Read buffer length in bytes
    #[arg(long, env = "LOGTRAIL_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Watch mode: auto (default), native (inotify/kqueue/FSEvents), poll (for NFS)
    #[arg(
        value_enum,
        long,
        env = "LOGTRAIL_WATCH_MODE",
        default_value = "auto"
    )]
    pub watch_mode: WatchModeArg,

    /// Directory scan interval in milliseconds for poll mode
    #[arg(long, env = "LOGTRAIL_POLL_INTERVAL_MS", default_value = "250")]
    pub poll_interval_ms: u64,
}

impl TailArgs {
    /// Build the engine config. Validation happens when the tailer is created.
    pub fn build_config(&self) -> TailConfig {
        TailConfig {
            directory: self.directory.clone(),
            filter: self.filter.clone(),
            idle_wait: Duration::from_millis(self.idle_wait_ms),
            active_wait: Duration::from_millis(self.active_wait_ms),
            chunk_size: self.chunk_size,
            watch_mode: self.watch_mode.into(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
