//! Error types for the daemon core

use thiserror::Error;

use seriald_bus::BusError;

/// Fatal daemon conditions
///
/// Everything here terminates the whole daemon; transient bus loss is
/// handled inside the bridge's reconnect supervisor and never surfaces
/// as an error.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The serial device reported end-of-file
    #[error("term closed")]
    DeviceClosed,

    /// A serial read or write failed with something other than would-block
    #[error("serial I/O failed: {0}")]
    SerialIo(#[source] std::io::Error),

    /// The serial device could not be opened or configured
    #[error("cannot open {port}: {source}")]
    OpenPort {
        /// Device path
        port: String,
        /// Underlying serial error
        source: tokio_serial::Error,
    },

    /// The pipe between the TTY engine and the bridge closed unexpectedly
    #[error("pipe closed")]
    PipeClosed,

    /// The bus was unreachable at startup
    #[error("cannot connect to bus: {0}")]
    BusConnect(#[source] BusError),

    /// Baud rate outside the supported set
    #[error("invalid baud rate: {0}")]
    InvalidBaud(u32),

    /// A daemon task panicked or was aborted
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
