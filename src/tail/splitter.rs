// SPDX-License-Identifier: Apache-2.0

//! Incremental CRLF record splitter.
//!
//! A record ends at a carriage-return immediately followed by a line-feed.
//! A lone `\r` or `\n` is ordinary record content. Bytes that have not yet
//! been terminated are kept in a carry buffer, so a terminator (or a
//! multi-byte UTF-8 character) split across two reads is reassembled, and a
//! partially written record survives until the writer finishes it.
//!
//! Splitting works on bytes. CR and LF are single-byte code points in UTF-8
//! and never appear inside a multi-byte sequence, so byte-level splitting
//! yields the same boundaries as character-level splitting. Completed records
//! are decoded lossily.

use std::collections::VecDeque;
use std::io::{self, Read};

use crate::tail::config::DEFAULT_CHUNK_SIZE;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Splits a byte stream from one file into CRLF-terminated records.
///
/// One splitter must be used per file and reused across every drain of that
/// file, otherwise the carry buffer is lost.
pub struct RecordSplitter {
    /// Content not yet terminated
    carry: Vec<u8>,
    /// Whether the last byte seen was a CR that may start a terminator
    pending_cr: bool,
    /// Read buffer, `chunk_size` long
    buf: Vec<u8>,
    /// Completed records not yet handed out
    ready: VecDeque<String>,
}

impl RecordSplitter {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a splitter that requests at most `chunk_size` bytes per read.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be at least 1");
        Self {
            carry: Vec::new(),
            pending_cr: false,
            buf: vec![0; chunk_size],
            ready: VecDeque::new(),
        }
    }

    /// Feed one chunk and return the records it completed.
    pub fn push(&mut self, chunk: &[u8]) -> std::collections::vec_deque::Drain<'_, String> {
        scan(&mut self.carry, &mut self.pending_cr, chunk, &mut self.ready);
        self.ready.drain(..)
    }

    /// Lazily read `source` chunk by chunk, yielding each completed record.
    ///
    /// The iterator ends when `source` reports no more data (a zero-length
    /// read). Unterminated content stays in the carry buffer for the next
    /// drain. A read error is yielded once and ends the iteration; records
    /// completed before the error are yielded first.
    pub fn drain<'a, R: Read>(&'a mut self, source: &'a mut R) -> Drain<'a, R> {
        Drain {
            splitter: self,
            source,
            done: false,
        }
    }

    /// Bytes received but not yet terminated
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }

    fn read_chunk<R: Read>(&mut self, source: &mut R) -> io::Result<usize> {
        let Self {
            carry,
            pending_cr,
            buf,
            ready,
        } = self;

        let n = source.read(buf)?;
        scan(carry, pending_cr, &buf[..n], ready);
        Ok(n)
    }
}

impl Default for RecordSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn scan(carry: &mut Vec<u8>, pending_cr: &mut bool, chunk: &[u8], ready: &mut VecDeque<String>) {
    // First byte of this chunk not yet copied into carry
    let mut write_start = 0;

    for (i, &byte) in chunk.iter().enumerate() {
        match byte {
            CR => *pending_cr = true,
            LF if *pending_cr => {
                // The CR sits at the end of carry, or inside [write_start, i)
                carry.extend_from_slice(&chunk[write_start..i]);
                carry.pop();
                ready.push_back(String::from_utf8_lossy(carry).into_owned());
                carry.clear();
                write_start = i + 1;
                *pending_cr = false;
            }
            _ => *pending_cr = false,
        }
    }

    carry.extend_from_slice(&chunk[write_start..]);
}

/// Lazy record iterator returned by [`RecordSplitter::drain`].
pub struct Drain<'a, R> {
    splitter: &'a mut RecordSplitter,
    source: &'a mut R,
    done: bool,
}

impl<R: Read> Iterator for Drain<'_, R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.splitter.ready.pop_front() {
                return Some(Ok(record));
            }

            if self.done {
                return None;
            }

            match self.splitter.read_chunk(self.source) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
