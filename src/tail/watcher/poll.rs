// SPDX-License-Identifier: Apache-2.0

//! Polling-based file watcher as a fallback for systems where native
//! file system notifications are unavailable or unreliable (e.g., NFS).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use super::traits::{FileEvent, FileWatcher, WatcherError};

/// File metadata for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileState {
    /// Last modification time
    modified: SystemTime,
    /// File size in bytes
    size: u64,
}

impl FileState {
    fn from_metadata(metadata: &fs::Metadata) -> Option<Self> {
        Some(Self {
            modified: metadata.modified().ok()?,
            size: metadata.len(),
        })
    }
}

/// Polling-based file watcher.
///
/// Periodically scans watched directories and reports files that appeared,
/// changed size or mtime, or disappeared since the previous scan. Files
/// present when a directory is first watched are recorded silently.
///
/// Within one scan, creations and modifications are reported oldest
/// modification time first, so a file written before another is queued
/// before it.
pub struct PollWatcher {
    /// Directories being watched
    watched_dirs: Vec<PathBuf>,
    /// Known file states from last poll
    file_states: HashMap<PathBuf, FileState>,
    poll_interval: Duration,
    last_poll: Instant,
    /// Pending events from last poll
    pending_events: Vec<FileEvent>,
}

impl PollWatcher {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            watched_dirs: Vec::new(),
            file_states: HashMap::new(),
            poll_interval,
            last_poll: Instant::now(),
            pending_events: Vec::new(),
        }
    }

    /// Scan all watched directories for changes
    fn scan_all(&mut self) -> Result<(), WatcherError> {
        let mut changed = Vec::new();
        let mut seen_files: HashSet<PathBuf> = HashSet::with_capacity(self.file_states.len());

        for i in 0..self.watched_dirs.len() {
            let dir = self.watched_dirs[i].clone();
            self.scan_directory(&dir, &mut seen_files, &mut changed)?;
        }

        changed.sort_by_key(|(modified, _)| *modified);
        let mut events: Vec<FileEvent> = changed.into_iter().map(|(_, event)| event).collect();

        // Check for removed files and remove them from state
        self.file_states.retain(|path, _| {
            if seen_files.contains(path) {
                true
            } else {
                events.push(FileEvent::remove(path.clone()));
                false
            }
        });

        self.pending_events.extend(events);
        self.last_poll = Instant::now();

        Ok(())
    }

    /// Scan a single directory for file changes
    fn scan_directory(
        &mut self,
        dir: &Path,
        seen_files: &mut HashSet<PathBuf>,
        events: &mut Vec<(SystemTime, FileEvent)>,
    ) -> Result<(), WatcherError> {
        let entries = fs::read_dir(dir)?;

        for entry in entries.flatten() {
            let path = entry.path();

            // Only track regular files
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            let new_state = match FileState::from_metadata(&metadata) {
                Some(s) => s,
                None => continue,
            };

            seen_files.insert(path.clone());

            match self.file_states.entry(path) {
                Entry::Vacant(entry) => {
                    events.push((new_state.modified, FileEvent::create(entry.key().clone())));
                    entry.insert(new_state);
                }
                Entry::Occupied(mut entry) => {
                    if *entry.get() != new_state {
                        events.push((new_state.modified, FileEvent::modify(entry.key().clone())));
                        entry.insert(new_state);
                    }
                }
            }
        }

        Ok(())
    }

    fn poll_if_needed(&mut self) -> Result<(), WatcherError> {
        if self.last_poll.elapsed() >= self.poll_interval {
            self.scan_all()?;
        }
        Ok(())
    }
}

impl FileWatcher for PollWatcher {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_dir() {
            return Err(WatcherError::Watch(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let path = path.to_path_buf();
        if self.watched_dirs.contains(&path) {
            return Ok(());
        }

        // Record existing files without reporting them
        let mut seen = HashSet::new();
        let mut discarded = Vec::new();
        self.scan_directory(&path, &mut seen, &mut discarded)?;
        self.watched_dirs.push(path);
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        self.poll_if_needed()?;
        Ok(std::mem::take(&mut self.pending_events))
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        let deadline = Instant::now() + timeout;

        loop {
            self.poll_if_needed()?;

            if !self.pending_events.is_empty() {
                return Ok(std::mem::take(&mut self.pending_events));
            }

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            // Sleep until next poll or timeout, whichever is sooner
            let time_to_next_poll = self.poll_interval.saturating_sub(self.last_poll.elapsed());
            let time_to_deadline = deadline.saturating_duration_since(Instant::now());
            let sleep_duration = time_to_next_poll.min(time_to_deadline);

            if !sleep_duration.is_zero() {
                std::thread::sleep(sleep_duration);
            }
        }
    }

    fn is_native(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "poll"
    }
}
