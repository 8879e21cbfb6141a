//! Bus Client Library
//!
//! This crate provides the wire protocol and client session for the local
//! publish/subscribe message bus the daemon bridges to. Frames are
//! newline-delimited JSON over a unix domain socket.
//!
//! # Architecture
//!
//! - [`BusMessage`] is the tagged frame enum (events, calls, replies,
//!   object registration)
//! - [`BusSession`] is one live connection, generic over the underlying
//!   I/O so tests run over `tokio::io::duplex` instead of a socket
//! - [`BusConnector`] is the narrow strategy seam that produces fresh
//!   sessions; the reconnect supervisor calls it every time the
//!   connection is replaced
//!
//! The client supports multiple live connections per process, so the
//! bridge runs as an in-process task rather than a forked helper.
//!
//! # Example
//!
//! ```rust,no_run
//! use seriald_bus::{BusConnector, UnixConnector};
//!
//! # async fn demo() -> Result<(), seriald_bus::BusError> {
//! let mut connector = UnixConnector::new(None);
//! let mut session = connector.connect().await?;
//! session.register("serial").await?;
//! session.publish("serial", serde_json::json!({"data": "OK"})).await?;
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod error;
pub mod memory;
pub mod message;
pub mod session;

pub use connector::{BusConnector, UnixConnector, DEFAULT_SOCKET_PATH};
pub use error::BusError;
pub use memory::{memory_bus, MemoryAcceptor, MemoryConnector};
pub use message::{BusMessage, Status};
pub use session::BusSession;
