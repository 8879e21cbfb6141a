//! Bus-side bridge task
//!
//! Owns the bus connection for the lifetime of the daemon. Inbound
//! direction: reads line envelopes from the engine pipe and publishes
//! them as bus events. Outbound direction: serves the `send` method of
//! the registered object, feeding the shared write queue.
//!
//! Startup is strict: if the bus cannot be reached when the daemon
//! starts there is nothing to bridge, and the whole daemon dies. Once
//! up, the connection is expendable: any loss is answered with an
//! immediate redial, then an infinite retry timer; the serial side
//! keeps running throughout and lines that arrive while the bus is
//! down are dropped.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use seriald_bus::{BusConnector, BusError, BusMessage, BusSession, Status};
use seriald_framing::{LineFramer, MAX_LINE_LEN};

use crate::error::DaemonError;
use crate::queue::WriteQueue;

/// Object name registered on the bus
pub const BUS_OBJECT: &str = "serial";

/// Event name lines are published under
pub const BUS_EVENT: &str = "serial";

/// Delay between reconnect attempts once the immediate redial failed
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Bytes per pipe read attempt
const PIPE_RD_SZ: usize = 512;

/// Bound on one pipe envelope: a serial line of [`MAX_LINE_LEN`] bytes
/// JSON-escapes to at most six bytes per character, plus the wrapper
const MAX_ENVELOPE_SZ: usize = 6 * MAX_LINE_LEN + 16;

/// The bus-side event loop
///
/// Generic over the connection strategy so tests run against an
/// in-memory bus, and over the pipe so any byte stream can stand in
/// for the engine.
pub struct BusBridge<C, R> {
    connector: C,
    pipe: R,
    queue: WriteQueue,
    shutdown: watch::Receiver<bool>,
}

impl<C, R> BusBridge<C, R>
where
    C: BusConnector,
    R: AsyncRead + Unpin,
{
    /// Create a bridge reading line envelopes from `pipe`
    pub fn new(
        connector: C,
        pipe: R,
        queue: WriteQueue,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            pipe,
            queue,
            shutdown,
        }
    }

    /// Run the loop until shutdown or a fatal condition
    ///
    /// The first connect is load-bearing and its failure is fatal;
    /// only losses after that enter the redial-and-retry path. Losing
    /// the engine pipe outside shutdown is fatal too.
    pub async fn run(mut self) -> Result<(), DaemonError> {
        let mut session = connect_once(&mut self.connector)
            .await
            .map_err(DaemonError::BusConnect)?;
        info!(object = BUS_OBJECT, "bus bridge connected");

        // pipe re-framing carries the same bounded-accumulator contract
        // as the serial read path, sized for the envelope expansion
        let mut framer = LineFramer::with_max_len(MAX_ENVELOPE_SZ);
        let mut rd_buf = vec![0u8; PIPE_RD_SZ];

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.shutdown.changed() => break,

                res = self.pipe.read(&mut rd_buf) => match res {
                    Ok(0) => {
                        if *self.shutdown.borrow() {
                            break;
                        }
                        return Err(DaemonError::PipeClosed);
                    }
                    Ok(n) => {
                        framer.push_bytes(&rd_buf[..n]);
                        while let Some(line) = framer.next_line() {
                            let payload = match serde_json::from_str(&line) {
                                Ok(v) => v,
                                Err(e) => {
                                    warn!(error = %e, "malformed envelope from engine");
                                    continue;
                                }
                            };
                            match self.publish(session, payload).await {
                                Some(s) => session = s,
                                None => return Ok(()),
                            }
                        }
                    }
                    Err(_) => return Err(DaemonError::PipeClosed),
                },

                res = session.next_message() => match res {
                    Ok(msg) => {
                        if let Err(e) = Self::handle_message(&mut session, &self.queue, msg).await {
                            warn!(error = %e, "bus session lost");
                            match self.reconnect().await {
                                Some(s) => session = s,
                                None => return Ok(()),
                            }
                        }
                    }
                    Err(e) if !e.is_connection_lost() => {
                        warn!(error = %e, "discarding malformed bus frame");
                    }
                    Err(e) => {
                        warn!(error = %e, "bus connection lost");
                        match self.reconnect().await {
                            Some(s) => session = s,
                            None => return Ok(()),
                        }
                    }
                },
            }
        }

        debug!("bus bridge stopped");
        Ok(())
    }

    /// Dispatch one inbound frame
    ///
    /// `send` calls on the registered object enqueue their `data`
    /// argument for the serial side and always succeed, whether or not
    /// the queue had room; a full queue drops the line. A missing or
    /// non-string `data` is an argument error; any other object or
    /// method is unknown.
    async fn handle_message(
        session: &mut BusSession<C::Io>,
        queue: &WriteQueue,
        msg: BusMessage,
    ) -> Result<(), BusError> {
        match msg {
            BusMessage::Call {
                id,
                object,
                method,
                args,
            } if object == BUS_OBJECT && method == "send" => {
                let status = match args.get("data").and_then(|v| v.as_str()) {
                    Some(data) => {
                        if !queue.enqueue(data) {
                            debug!(len = data.len(), "write queue full, line dropped");
                        }
                        Status::Ok
                    }
                    None => Status::InvalidArgument,
                };
                session.reply(id, status).await
            }
            BusMessage::Call {
                id, object, method, ..
            } => {
                debug!(object, method, "call to unknown object or method");
                session.reply(id, Status::NotFound).await
            }
            other => {
                trace!(?other, "ignoring non-call frame");
                Ok(())
            }
        }
    }

    /// Publish one line envelope, riding out a connection loss
    ///
    /// A failed publish redials once and resends on the fresh session;
    /// if that also fails the line is dropped and the timed reconnect
    /// loop takes over. `None` means shutdown arrived while waiting.
    async fn publish(
        &mut self,
        mut session: BusSession<C::Io>,
        payload: serde_json::Value,
    ) -> Option<BusSession<C::Io>> {
        if session.publish(BUS_EVENT, payload.clone()).await.is_ok() {
            return Some(session);
        }
        warn!("bus publish failed, redialing");
        drop(session);

        match connect_once(&mut self.connector).await {
            Ok(mut fresh) => match fresh.publish(BUS_EVENT, payload).await {
                Ok(()) => {
                    info!("bus connection reestablished");
                    return Some(fresh);
                }
                Err(e) => warn!(error = %e, "publish retry failed, line dropped"),
            },
            Err(e) => warn!(error = %e, "immediate redial failed"),
        }

        self.reconnect().await
    }

    /// Redial immediately, then every [`RECONNECT_INTERVAL`] until the
    /// connection lands or shutdown is signalled
    async fn reconnect(&mut self) -> Option<BusSession<C::Io>> {
        loop {
            if *self.shutdown.borrow() {
                return None;
            }
            match connect_once(&mut self.connector).await {
                Ok(session) => {
                    info!("bus connection reestablished");
                    return Some(session);
                }
                Err(e) => debug!(error = %e, "bus reconnect failed"),
            }
            tokio::select! {
                _ = self.shutdown.changed() => return None,
                _ = tokio::time::sleep(RECONNECT_INTERVAL) => {}
            }
        }
    }
}

/// Dial the bus and announce the serial object
async fn connect_once<C: BusConnector>(
    connector: &mut C,
) -> Result<BusSession<C::Io>, BusError> {
    let mut session = connector.connect().await?;
    session.register(BUS_OBJECT).await?;
    Ok(session)
}
