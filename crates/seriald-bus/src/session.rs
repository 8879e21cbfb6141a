//! One live bus connection
//!
//! A session frames [`BusMessage`] values as newline-delimited JSON over
//! any async byte stream. Reads are cancellation-safe: partial frames
//! accumulate inside the session, so a `next_message` future dropped by
//! a `select!` loses nothing.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::trace;

use crate::error::BusError;
use crate::message::{BusMessage, Status};

/// A single connection to the bus
///
/// Generic over the underlying I/O: production uses a [`UnixStream`],
/// tests use `tokio::io::duplex`. Replaced wholesale on reconnect,
/// never shared.
pub struct BusSession<T> {
    io: BufReader<T>,
    /// Bytes of the frame currently being assembled
    frame_buf: Vec<u8>,
}

impl BusSession<UnixStream> {
    /// Connect to the bus socket at `path`
    pub async fn connect(path: &Path) -> Result<Self, BusError> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::new(stream))
    }
}

impl<T> BusSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-established byte stream
    pub fn new(io: T) -> Self {
        Self {
            io: BufReader::new(io),
            frame_buf: Vec::new(),
        }
    }

    /// Send one frame
    pub async fn send(&mut self, msg: &BusMessage) -> Result<(), BusError> {
        let mut frame = serde_json::to_vec(msg)?;
        frame.push(b'\n');
        self.io.write_all(&frame).await?;
        self.io.flush().await?;
        trace!(len = frame.len(), "sent bus frame");
        Ok(())
    }

    /// Announce a callable object
    pub async fn register(&mut self, object: &str) -> Result<(), BusError> {
        self.send(&BusMessage::Register {
            object: object.to_string(),
        })
        .await
    }

    /// Publish an event
    pub async fn publish(
        &mut self,
        event: &str,
        data: serde_json::Value,
    ) -> Result<(), BusError> {
        self.send(&BusMessage::Event {
            event: event.to_string(),
            data,
        })
        .await
    }

    /// Answer a call
    pub async fn reply(&mut self, id: u64, status: Status) -> Result<(), BusError> {
        self.send(&BusMessage::Reply { id, status }).await
    }

    /// Wait for the next inbound frame
    ///
    /// Returns [`BusError::ConnectionClosed`] on EOF. A decode failure is
    /// reported per frame and does not tear down the session.
    pub async fn next_message(&mut self) -> Result<BusMessage, BusError> {
        loop {
            if let Some(pos) = self.frame_buf.iter().position(|&b| b == b'\n') {
                let frame: Vec<u8> = self.frame_buf.drain(..=pos).collect();
                let msg = serde_json::from_slice(&frame[..frame.len() - 1])?;
                trace!("received bus frame");
                return Ok(msg);
            }

            let chunk = self.io.fill_buf().await?;
            if chunk.is_empty() {
                return Err(BusError::ConnectionClosed);
            }
            let n = chunk.len();
            self.frame_buf.extend_from_slice(chunk);
            self.io.consume(n);
        }
    }
}
