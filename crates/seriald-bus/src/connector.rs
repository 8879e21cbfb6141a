//! Connection strategies
//!
//! The bridge never holds a socket path itself; it holds a
//! [`BusConnector`] and asks it for a fresh session every time the
//! connection is replaced. Production connects to a unix socket,
//! tests plug in [`crate::MemoryConnector`].

use std::future::Future;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

use crate::error::BusError;
use crate::session::BusSession;

/// Bus socket used when no override is given
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/ubus.sock";

/// Produces fresh bus sessions for the bridge and its reconnect loop
pub trait BusConnector: Send {
    /// Underlying byte stream of the sessions this connector produces
    type Io: AsyncRead + AsyncWrite + Unpin + Send;

    /// Establish a new connection
    fn connect(
        &mut self,
    ) -> impl Future<Output = Result<BusSession<Self::Io>, BusError>> + Send;
}

/// Connects to the bus over a unix domain socket
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    /// Create a connector for `path`, or the default socket when `None`
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
        }
    }

    /// The socket path this connector dials
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl BusConnector for UnixConnector {
    type Io = UnixStream;

    async fn connect(&mut self) -> Result<BusSession<UnixStream>, BusError> {
        BusSession::connect(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_path() {
        let connector = UnixConnector::new(None);
        assert_eq!(connector.path(), &PathBuf::from(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn test_socket_override() {
        let connector = UnixConnector::new(Some(PathBuf::from("/tmp/bus.sock")));
        assert_eq!(connector.path(), &PathBuf::from("/tmp/bus.sock"));
    }
}
