// SPDX-License-Identifier: Apache-2.0

//! Tailer: the public control surface of the engine.
//!
//! Architecture:
//! - On construction the directory watcher is created, then the directory is
//!   scanned and every matching file is queued in listing order
//! - The watcher belongs to the tailer, not to a run. Files created before
//!   `start`, or while stopped, are reported when the next run begins
//! - `start` spawns two OS threads: a change notifier that feeds the pending
//!   queue from the watcher, and the tail loop that drains the queue
//! - The queue is the only state the two threads share; a wake signal lets the
//!   notifier release a parked tail loop early
//! - `stop` raises a shared flag and joins both threads. Joining can take up
//!   to the tail loop's `active_wait` when it is parked on a file

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use tracing::{error, info, warn};

use crate::tail::config::TailConfig;
use crate::tail::error::{Error, Result};
use crate::tail::events::{LifecycleEventBus, LifecycleListener, ListenerId};
use crate::tail::finder::FileFinder;
use crate::tail::notifier::{ChangeNotifier, NotifierHandle};
use crate::tail::queue::PendingFileQueue;
use crate::tail::sink::{BlackholeSink, RecordSink};
use crate::tail::tail_loop::{TailLoop, TailLoopConfig};
use crate::tail::watcher::{BoxedWatcher, create_watcher};
use crate::wake::WakeSignal;

type TailHandle = JoinHandle<(Box<dyn RecordSink>, Result<()>)>;

/// Threads of one start/stop cycle
struct Running {
    stop: Arc<AtomicBool>,
    tail: TailHandle,
    notifier: NotifierHandle,
}

/// Tails the matching files of one directory, oldest first.
pub struct Tailer {
    config: TailConfig,
    finder: FileFinder,
    queue: Arc<PendingFileQueue>,
    wake: WakeSignal,
    events: Arc<LifecycleEventBus>,
    sink: Option<Box<dyn RecordSink>>,
    /// Held while stopped, lent to the notifier thread while running
    watcher: Option<BoxedWatcher>,
    running: Option<Running>,
}

impl Tailer {
    /// Validate `config` and queue the matching files already in the directory.
    pub fn new(mut config: TailConfig) -> Result<Self> {
        config.validate()?;

        // Watchers report canonical paths on some platforms
        config.directory = config.directory.canonicalize()?;
        let finder = FileFinder::new(config.directory.clone(), &config.filter)?;

        // Watch before scanning, so a file created in between is reported
        // rather than missed
        let watcher = create_watcher(config.watch_mode, &config.directory, config.poll_interval)?;
        let existing = finder.find_files()?;

        info!(
            directory = %config.directory.display(),
            filter = %config.filter,
            backend = watcher.backend_name(),
            native = watcher.is_native(),
            existing = existing.len(),
            "Created tailer"
        );

        Ok(Self {
            config,
            finder,
            queue: Arc::new(PendingFileQueue::from_paths(existing)),
            wake: WakeSignal::new(),
            events: Arc::new(LifecycleEventBus::new()),
            sink: None,
            watcher: Some(watcher),
            running: None,
        })
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Replace the record sink. Only allowed while stopped.
    pub fn set_sink(&mut self, sink: impl RecordSink + 'static) -> Result<()> {
        if self.running.is_some() {
            return Err(Error::AlreadyRunning);
        }
        self.sink = Some(Box::new(sink));
        Ok(())
    }

    /// Register a lifecycle listener. Safe to call while running.
    pub fn subscribe(&self, listener: impl LifecycleListener + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Files waiting to be tailed, front (currently tailed) first
    pub fn pending_files(&self) -> Vec<PathBuf> {
        self.queue.snapshot()
    }

    /// Whether the tail loop is alive. False after `stop`, and after a fatal
    /// failure that ended the loop on its own.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.tail.is_finished())
    }

    /// Start the notifier and tail loop. Does nothing if already running.
    ///
    /// If a previous run ended on its own with an error, that error is
    /// returned and nothing is started; the next call starts normally.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        if self.running.is_some() {
            self.stop()?;
        }

        let watcher = match self.watcher.take() {
            Some(watcher) => watcher,
            None => {
                // The previous watcher failed; changes since then are not reported
                warn!(
                    directory = %self.finder.directory().display(),
                    "Recreating directory watcher"
                );
                create_watcher(
                    self.config.watch_mode,
                    &self.config.directory,
                    self.config.poll_interval,
                )?
            }
        };

        info!(
            directory = %self.finder.directory().display(),
            backend = watcher.backend_name(),
            pending = self.queue.len(),
            "Starting tailer"
        );

        let stop = Arc::new(AtomicBool::new(false));

        let notifier = ChangeNotifier::new(self.finder.clone(), self.queue.clone(), self.wake.clone())
            .spawn(watcher, stop.clone(), self.config.poll_interval)?;

        let sink = self.sink.take().unwrap_or_else(|| Box::new(BlackholeSink));
        let tail_loop = TailLoop::new(
            self.queue.clone(),
            self.wake.clone(),
            stop.clone(),
            self.events.clone(),
            sink,
            TailLoopConfig {
                idle_wait: self.config.idle_wait,
                active_wait: self.config.active_wait,
                chunk_size: self.config.chunk_size,
            },
        );

        let tail = match std::thread::Builder::new()
            .name("logtrail-tail".to_string())
            .spawn(move || tail_loop.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                stop.store(true, Ordering::SeqCst);
                if let Ok((watcher, Ok(()))) = notifier.join() {
                    self.watcher = Some(watcher);
                }
                return Err(e.into());
            }
        };

        self.running = Some(Running {
            stop,
            tail,
            notifier,
        });
        Ok(())
    }

    /// Stop both threads and wait for them to exit. Does nothing if stopped.
    ///
    /// Blocks for up to `active_wait` plus `poll_interval`. Returns the
    /// failure that ended the run, if any: a notifier failure first, then a
    /// sink or listener failure, then a panic in the tail loop.
    pub fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.stop.store(true, Ordering::SeqCst);
        self.wake.notify();

        let tail_result = match running.tail.join() {
            Ok((sink, result)) => {
                self.sink = Some(sink);
                result
            }
            Err(_) => {
                error!("Tail loop panicked");
                Err(Error::WorkerPanicked)
            }
        };

        // A failed watcher is dropped and recreated by the next start
        let notifier_result = match running.notifier.join() {
            Ok((watcher, Ok(()))) => {
                self.watcher = Some(watcher);
                Ok(())
            }
            Ok((_, Err(e))) => Err(Error::from(e)),
            Err(_) => Err(Error::WorkerPanicked),
        };

        info!("Tailer stopped");
        notifier_result.and(tail_result)
    }
}

impl Drop for Tailer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Tailer stopped with error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tail::error::BoxError;
    use crate::tail::events::LifecycleEvent;
    use crate::tail::sink::ChannelSink;
    use crate::tail::watcher::WatchMode;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> TailConfig {
        TailConfig {
            idle_wait: Duration::from_millis(100),
            active_wait: Duration::from_millis(300),
            watch_mode: WatchMode::Poll,
            poll_interval: Duration::from_millis(20),
            ..TailConfig::new(dir.path(), "*.log")
        }
    }

    #[test]
    fn test_new_queues_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.log"), b"").unwrap();
        fs::write(dir.path().join("b.log"), b"").unwrap();
        fs::write(dir.path().join("c.txt"), b"").unwrap();

        let tailer = Tailer::new(test_config(&dir)).unwrap();
        assert_eq!(tailer.config().directory, dir.path().canonicalize().unwrap());
        let names: Vec<_> = tailer
            .pending_files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a.log".to_string()));
        assert!(names.contains(&"b.log".to_string()));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.chunk_size = 0;
        assert!(matches!(Tailer::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_start_stop_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut tailer = Tailer::new(test_config(&dir)).unwrap();

        assert!(tailer.stop().is_ok());
        tailer.start().unwrap();
        tailer.start().unwrap();
        assert!(tailer.is_running());

        tailer.stop().unwrap();
        assert!(!tailer.is_running());
        tailer.stop().unwrap();
    }

    #[test]
    fn test_set_sink_rejected_while_running() {
        let dir = TempDir::new().unwrap();
        let mut tailer = Tailer::new(test_config(&dir)).unwrap();
        tailer.start().unwrap();

        assert!(matches!(
            tailer.set_sink(BlackholeSink),
            Err(Error::AlreadyRunning)
        ));

        tailer.stop().unwrap();
        assert!(tailer.set_sink(BlackholeSink).is_ok());
    }

    #[test]
    fn test_restart_reuses_sink() {
        let dir = TempDir::new().unwrap();
        let mut tailer = Tailer::new(test_config(&dir)).unwrap();
        let (sink, records) = ChannelSink::unbounded();
        tailer.set_sink(sink).unwrap();

        tailer.start().unwrap();
        tailer.stop().unwrap();

        tailer.start().unwrap();
        fs::write(dir.path().join("a.log"), b"after restart\r\n").unwrap();
        assert_eq!(
            records.recv_timeout(Duration::from_secs(2)).unwrap(),
            "after restart"
        );
        tailer.stop().unwrap();
    }

    #[test]
    fn test_files_created_while_stopped_are_tailed() {
        let dir = TempDir::new().unwrap();
        let mut tailer = Tailer::new(test_config(&dir)).unwrap();
        let (sink, records) = ChannelSink::unbounded();
        tailer.set_sink(sink).unwrap();

        // Created after the initial scan, before the first start
        fs::write(dir.path().join("a.log"), b"before start\r\n").unwrap();
        tailer.start().unwrap();
        assert_eq!(
            records.recv_timeout(Duration::from_secs(2)).unwrap(),
            "before start"
        );
        tailer.stop().unwrap();

        // Created while stopped; a.log is reopened from its start first
        fs::write(dir.path().join("b.log"), b"while stopped\r\n").unwrap();
        tailer.start().unwrap();
        assert_eq!(
            records.recv_timeout(Duration::from_secs(2)).unwrap(),
            "before start"
        );
        assert_eq!(
            records.recv_timeout(Duration::from_secs(2)).unwrap(),
            "while stopped"
        );
        tailer.stop().unwrap();

        let names: Vec<_> = tailer
            .pending_files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.log"]);
    }

    #[test]
    fn test_listener_failure_surfaces_on_stop() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.log"), b"x\r\n").unwrap();

        let mut tailer = Tailer::new(test_config(&dir)).unwrap();
        tailer.subscribe(|_: &LifecycleEvent| -> std::result::Result<(), BoxError> {
            Err("listener down".into())
        });
        tailer.start().unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while tailer.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!tailer.is_running());
        assert!(matches!(tailer.stop(), Err(Error::Listener(_))));
    }

    #[test]
    fn test_new_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let config = TailConfig {
            directory: dir.path().join("missing"),
            ..test_config(&dir)
        };
        assert!(matches!(Tailer::new(config), Err(Error::DirectoryNotFound(_))));
    }

    #[test]
    fn test_watcher_recreated_after_failure() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir(&logs).unwrap();

        let mut tailer = Tailer::new(TailConfig {
            directory: logs.clone(),
            ..test_config(&dir)
        })
        .unwrap();
        let (sink, records) = ChannelSink::unbounded();
        tailer.set_sink(sink).unwrap();

        tailer.start().unwrap();
        fs::remove_dir(&logs).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while tailer.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(matches!(tailer.stop(), Err(Error::Watcher(_))));

        // The failed watcher is gone and the directory cannot be watched
        assert!(matches!(tailer.start(), Err(Error::Watcher(_))));
        assert!(!tailer.is_running());

        fs::create_dir(&logs).unwrap();
        tailer.start().unwrap();
        fs::write(logs.join("a.log"), b"recovered\r\n").unwrap();
        assert_eq!(
            records.recv_timeout(Duration::from_secs(2)).unwrap(),
            "recovered"
        );
        tailer.stop().unwrap();
    }

    #[test]
    fn test_watcher_failure_stops_tailer() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir(&logs).unwrap();

        let mut tailer = Tailer::new(TailConfig {
            directory: logs.clone(),
            ..test_config(&dir)
        })
        .unwrap();
        tailer.start().unwrap();
        fs::remove_dir(&logs).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while tailer.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!tailer.is_running());
        assert!(matches!(tailer.stop(), Err(Error::Watcher(_))));
    }
}
