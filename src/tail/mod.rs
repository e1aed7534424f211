// SPDX-License-Identifier: Apache-2.0

//! Directory tailing engine.
//!
//! Watches one directory for files matching a glob filter and streams their
//! CRLF-terminated records to a [`RecordSink`], one file at a time, in the
//! order the files were discovered. A file stays open until a newer file is
//! queued behind it, at which point it is drained to its current end and
//! retired.
//!
//! # Example
//!
//! ```no_run
//! use logtrail::tail::{ChannelSink, TailConfig, Tailer};
//!
//! let mut tailer = Tailer::new(TailConfig::new("/var/log/app", "*.log"))?;
//! let (sink, records) = ChannelSink::unbounded();
//! tailer.set_sink(sink)?;
//! tailer.start()?;
//!
//! for record in records.iter().take(10) {
//!     println!("{record}");
//! }
//! tailer.stop()?;
//! # Ok::<(), logtrail::tail::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod finder;
pub mod notifier;
pub mod queue;
pub mod sink;
pub mod splitter;
pub mod tail_loop;
pub mod tailer;
pub mod watcher;

pub use config::{DEFAULT_CHUNK_SIZE, TailConfig};
pub use error::{BoxError, Error, Result};
pub use events::{LifecycleEvent, LifecycleEventBus, LifecycleListener, ListenerId};
pub use finder::FileFinder;
pub use queue::PendingFileQueue;
pub use sink::{BlackholeSink, ChannelSink, RecordSink, WriterSink};
pub use splitter::RecordSplitter;
pub use tailer::Tailer;
pub use watcher::WatchMode;
