//! Error types for the bus client

use thiserror::Error;

/// Errors that can occur on a bus connection
#[derive(Debug, Error)]
pub enum BusError {
    /// Transport-level I/O failure
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded
    #[error("bad bus frame: {0}")]
    Codec(#[from] serde_json::Error),

    /// The peer closed the connection
    #[error("bus connection closed")]
    ConnectionClosed,
}

impl BusError {
    /// Whether this error means the connection is gone and a fresh
    /// session is needed, as opposed to a single bad frame
    pub fn is_connection_lost(&self) -> bool {
        !matches!(self, BusError::Codec(_))
    }
}
