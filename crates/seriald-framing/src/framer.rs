//! Streaming line framer
//!
//! The framer follows the same streaming shape as a protocol codec:
//! `push_bytes` accepts arbitrarily-chunked input (reads from a serial
//! port are not line-aligned) and `next_line` drains completed lines in
//! arrival order.

use std::collections::VecDeque;

use tracing::debug;

/// Default maximum length of a single framed line, in bytes
///
/// A sender that emits more than this many bytes without a newline gets
/// the line split at this bound (truncation, never loss).
pub const MAX_LINE_LEN: usize = 256;

/// Streaming newline-delimited line framer
///
/// Holds at most its configured line bound of partial-line state across
/// calls, so memory use stays fixed no matter what the sender does.
/// Owned explicitly by the caller so the read path and the bridge pipe
/// path each carry their own instance.
pub struct LineFramer {
    /// Partial line accumulated across pushes, `\r` already stripped
    partial: Vec<u8>,
    /// Completed lines waiting to be drained
    ready: VecDeque<String>,
    /// Bound at which an unterminated line is split
    max_len: usize,
}

impl LineFramer {
    /// Create an empty framer with the [`MAX_LINE_LEN`] bound
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// Create an empty framer that splits unterminated lines at
    /// `max_len` bytes instead of the default
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            partial: Vec::with_capacity(max_len),
            ready: VecDeque::new(),
            max_len,
        }
    }

    /// Push a chunk of raw bytes into the framer
    ///
    /// The chunk need not be newline-terminated; anything after the last
    /// delimiter becomes the new partial-line state.
    pub fn push_bytes(&mut self, data: &[u8]) {
        let mut rest = data;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.accumulate(&rest[..pos]);
            self.complete_line();
            rest = &rest[pos + 1..];
        }
        self.accumulate(rest);
    }

    /// Drain the next completed line, if any
    ///
    /// Lines are decoded as UTF-8 with invalid sequences replaced by
    /// U+FFFD, so no line is ever withheld but non-UTF-8 payload bytes
    /// do not round-trip verbatim.
    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Number of bytes held as partial-line state
    pub fn partial_len(&self) -> usize {
        self.partial.len()
    }

    /// Discard all partial and completed state
    pub fn clear(&mut self) {
        self.partial.clear();
        self.ready.clear();
    }

    /// Append a delimiter-free segment, flushing early on overflow
    fn accumulate(&mut self, segment: &[u8]) {
        let clean: Vec<u8> = segment
            .iter()
            .copied()
            .filter(|&b| b != b'\r')
            .collect();
        let mut seg = clean.as_slice();

        while self.partial.len() + seg.len() > self.max_len {
            if !self.partial.is_empty() {
                debug!(
                    len = self.partial.len(),
                    max = self.max_len,
                    "line exceeds bound, flushing truncated"
                );
                self.complete_line();
            }
            let take = seg.len().min(self.max_len);
            self.partial.extend_from_slice(&seg[..take]);
            seg = &seg[take..];
        }
        self.partial.extend_from_slice(seg);

        debug_assert!(self.partial.len() <= self.max_len);
    }

    /// Move the accumulated partial into the ready queue
    fn complete_line(&mut self) {
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        self.ready.push_back(line);
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
