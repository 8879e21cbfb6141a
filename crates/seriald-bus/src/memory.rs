//! In-memory bus endpoints
//!
//! A bus that lives entirely inside the process, built on
//! `tokio::io::duplex`. Lets the bridge and its reconnect supervisor be
//! exercised without a bus daemon or a socket, the same way the
//! simulation layer in this workspace's ancestry replaced physical
//! serial hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::connector::BusConnector;
use crate::error::BusError;
use crate::session::BusSession;

/// Buffer size of each in-memory connection
const PIPE_CAPACITY: usize = 4096;

/// Create a connected in-memory bus
///
/// The [`MemoryConnector`] goes to the bridge under test; the
/// [`MemoryAcceptor`] plays the bus daemon and yields one server-side
/// session per `connect` call.
pub fn memory_bus() -> (MemoryConnector, MemoryAcceptor) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let refuse = Arc::new(AtomicBool::new(false));
    (
        MemoryConnector {
            accept_tx,
            refuse: refuse.clone(),
        },
        MemoryAcceptor {
            rx: accept_rx,
            refuse,
        },
    )
}

/// Client side of the in-memory bus
pub struct MemoryConnector {
    accept_tx: mpsc::UnboundedSender<DuplexStream>,
    refuse: Arc<AtomicBool>,
}

impl BusConnector for MemoryConnector {
    type Io = DuplexStream;

    async fn connect(&mut self) -> Result<BusSession<DuplexStream>, BusError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(BusError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "bus refused connection",
            )));
        }

        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        self.accept_tx
            .send(server)
            .map_err(|_| BusError::ConnectionClosed)?;
        Ok(BusSession::new(client))
    }
}

/// Server side of the in-memory bus
pub struct MemoryAcceptor {
    rx: mpsc::UnboundedReceiver<DuplexStream>,
    refuse: Arc<AtomicBool>,
}

impl MemoryAcceptor {
    /// Wait for the next connection attempt
    pub async fn accept(&mut self) -> Option<BusSession<DuplexStream>> {
        self.rx.recv().await.map(BusSession::new)
    }

    /// Make subsequent connection attempts fail (or succeed again)
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}
