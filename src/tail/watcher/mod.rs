// SPDX-License-Identifier: Apache-2.0

//! File system watcher abstractions used by the change notifier.
//!
//! This module provides two watching strategies:
//! - **Native watching**: Uses OS-level file system notifications (inotify on Linux,
//!   FSEvents on macOS, ReadDirectoryChangesW on Windows) for immediate event detection.
//! - **Poll watching**: Falls back to periodic directory scans for environments
//!   where native watching isn't available or reliable (e.g., NFS, network shares).
//!
//! The recommended approach is to use `auto` mode which attempts native watching
//! first and falls back to polling if it fails.

#[cfg(test)]
mod mock;
mod native;
mod poll;
mod traits;

#[cfg(test)]
pub use mock::MockWatcher;
pub use native::NativeWatcher;
pub use poll::PollWatcher;
pub use traits::{FileEvent, FileEventKind, FileWatcher, WatcherError};

use std::path::Path;
use std::time::Duration;

/// Watch mode configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    /// Automatically select the best watching strategy.
    /// Tries native watching first, falls back to polling on failure.
    #[default]
    Auto,
    /// Force native file system watching (inotify/kqueue/FSEvents).
    /// Will fail if native watching is not supported.
    Native,
    /// Force polling mode. Use this for network file systems (NFS)
    /// or when native watching is unreliable.
    Poll,
}

impl std::str::FromStr for WatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(WatchMode::Auto),
            "native" => Ok(WatchMode::Native),
            "poll" | "polling" => Ok(WatchMode::Poll),
            _ => Err(format!(
                "Invalid watch mode '{}'. Valid options: auto, native, poll",
                s
            )),
        }
    }
}

pub type BoxedWatcher = Box<dyn FileWatcher + Send>;

/// Create a watcher for `directory`.
///
/// In `Auto` mode, this tries native watching first and falls back to polling
/// if the native watcher cannot be created or cannot watch the directory.
pub fn create_watcher(
    mode: WatchMode,
    directory: &Path,
    poll_interval: Duration,
) -> Result<BoxedWatcher, WatcherError> {
    match mode {
        WatchMode::Native => native_watcher(directory),
        WatchMode::Poll => poll_watcher(directory, poll_interval),
        WatchMode::Auto => match native_watcher(directory) {
            Ok(watcher) => Ok(watcher),
            Err(e) => {
                tracing::warn!(
                    "Native file watching unavailable ({}), falling back to polling",
                    e
                );
                poll_watcher(directory, poll_interval)
            }
        },
    }
}

fn native_watcher(directory: &Path) -> Result<BoxedWatcher, WatcherError> {
    let mut watcher = NativeWatcher::new()?;
    watcher.watch(directory)?;
    Ok(Box::new(watcher))
}

fn poll_watcher(directory: &Path, poll_interval: Duration) -> Result<BoxedWatcher, WatcherError> {
    let mut watcher = PollWatcher::new(poll_interval);
    watcher.watch(directory)?;
    Ok(Box::new(watcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_watch_mode_from_str() {
        assert_eq!("auto".parse::<WatchMode>().unwrap(), WatchMode::Auto);
        assert_eq!("native".parse::<WatchMode>().unwrap(), WatchMode::Native);
        assert_eq!("poll".parse::<WatchMode>().unwrap(), WatchMode::Poll);
        assert_eq!("polling".parse::<WatchMode>().unwrap(), WatchMode::Poll);
        assert_eq!("AUTO".parse::<WatchMode>().unwrap(), WatchMode::Auto);
        assert!("invalid".parse::<WatchMode>().is_err());
    }

    #[test]
    fn test_create_poll_watcher() {
        let dir = TempDir::new().unwrap();
        let watcher =
            create_watcher(WatchMode::Poll, dir.path(), Duration::from_millis(50)).unwrap();
        assert_eq!(watcher.backend_name(), "poll");
    }

    #[test]
    fn test_create_watcher_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(create_watcher(WatchMode::Poll, &missing, Duration::from_millis(50)).is_err());
        assert!(create_watcher(WatchMode::Auto, &missing, Duration::from_millis(50)).is_err());
    }
}
