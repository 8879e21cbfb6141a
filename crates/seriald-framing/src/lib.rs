//! Line Framing Library
//!
//! This crate turns an unstructured serial byte stream into discrete
//! newline-delimited lines. It is pure state-machine code with no I/O,
//! sitting between the TTY read path and everything downstream.
//!
//! # Framing rules
//!
//! - `\n` completes the accumulated line (which may be empty)
//! - every `\r` is stripped from the emitted line
//! - a run of non-newline bytes longer than the configured bound
//!   ([`MAX_LINE_LEN`] by default) is split at the bound: the accumulated
//!   partial line is flushed early as a truncated line rather than
//!   raising an error. No bytes are dropped.
//! - lines decode as UTF-8; invalid sequences become U+FFFD replacement
//!   characters instead of being discarded
//!
//! The truncation behavior is an observable contract for senders that
//! never emit a newline.
//!
//! # Example
//!
//! ```rust
//! use seriald_framing::LineFramer;
//!
//! let mut framer = LineFramer::new();
//! framer.push_bytes(b"AT\r\nOK\r\n");
//!
//! assert_eq!(framer.next_line().as_deref(), Some("AT"));
//! assert_eq!(framer.next_line().as_deref(), Some("OK"));
//! assert_eq!(framer.next_line(), None);
//! ```

pub mod framer;

pub use framer::{LineFramer, MAX_LINE_LEN};
