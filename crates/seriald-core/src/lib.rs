//! Serial Bridge Daemon Core
//!
//! This crate contains the concurrency skeleton of the daemon: the
//! non-blocking TTY event loop, the bounded shared write queue, the bus
//! bridge with its reconnect supervisor, and the top-level runtime that
//! wires them together.
//!
//! # Architecture
//!
//! Two cooperative loops connected by two one-way paths:
//!
//! ```text
//! serial bytes -> LineFramer -> byte pipe -> BusBridge -> bus event
//! bus call -> BusBridge -> WriteQueue (+wake) -> TtyEngine -> serial write
//! ```
//!
//! - [`engine::TtyEngine`] multiplexes serial-read, serial-write and the
//!   queue wake channel on one task
//! - [`bridge::BusBridge`] owns the bus connection on a second task,
//!   re-frames the pipe byte stream and dispatches inbound `send` calls
//! - [`queue::WriteQueue`] is the only mutable state shared between them
//! - [`daemon::run`] is the supervisor: open the port, wire the pipe and
//!   shutdown watch, spawn both tasks, join them
//!
//! Everything is generic over the underlying I/O so the whole daemon
//! runs over `tokio::io::duplex` in tests.

pub mod bridge;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod queue;
pub mod signal;

pub use bridge::{BusBridge, BUS_EVENT, BUS_OBJECT, RECONNECT_INTERVAL};
pub use config::{DaemonConfig, FlowControl, SUPPORTED_BAUD_RATES};
pub use daemon::{run, run_with_io};
pub use engine::TtyEngine;
pub use error::DaemonError;
pub use queue::{TtyQueue, WriteQueue, TTY_QUEUE_CAP};
