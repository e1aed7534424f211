// SPDX-License-Identifier: Apache-2.0

//! Record sinks.
//!
//! A sink receives every record, without its terminator, in file order and
//! record order. It is called synchronously on the tail thread, so a slow
//! sink stalls tailing. A sink error stops the tail loop.

use std::io::Write;

use flume::Sender;

use crate::tail::error::BoxError;

pub trait RecordSink: Send {
    /// Accept one record
    fn accept(&mut self, record: String) -> Result<(), BoxError>;
}

impl<F> RecordSink for F
where
    F: FnMut(String) -> Result<(), BoxError> + Send,
{
    fn accept(&mut self, record: String) -> Result<(), BoxError> {
        self(record)
    }
}

/// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeSink;

impl RecordSink for BlackholeSink {
    fn accept(&mut self, _record: String) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Forwards records into a channel. Fails once the receiver is gone.
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }

    /// Create an unbounded channel and a sink feeding it
    pub fn unbounded() -> (Self, flume::Receiver<String>) {
        let (tx, rx) = flume::unbounded();
        (Self::new(tx), rx)
    }
}

impl RecordSink for ChannelSink {
    fn accept(&mut self, record: String) -> Result<(), BoxError> {
        self.tx
            .send(record)
            .map_err(|_| -> BoxError { "record channel disconnected".into() })
    }
}

/// Writes each record followed by `\n`
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for WriterSink<W> {
    fn accept(&mut self, record: String) -> Result<(), BoxError> {
        self.writer.write_all(record.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
