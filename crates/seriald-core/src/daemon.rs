//! Top-level daemon runtime
//!
//! [`run`] opens the real serial port and bus socket; [`run_with_io`]
//! is the seam below it, generic over both so the whole daemon can be
//! driven over in-memory streams.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_serial::{DataBits, Parity, SerialPort, SerialPortBuilderExt, StopBits};
use tracing::{debug, info};

use seriald_bus::{BusConnector, UnixConnector};

use crate::bridge::BusBridge;
use crate::config::DaemonConfig;
use crate::engine::TtyEngine;
use crate::error::DaemonError;
use crate::queue::WriteQueue;
use crate::signal;

/// Buffer size of the engine-to-bridge byte pipe
const PIPE_CAPACITY: usize = 4096;

/// Run the daemon against the configured serial device and bus socket
///
/// Returns when SIGTERM lands (cleanly) or when either side hits a
/// fatal condition.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    config.validate()?;

    let port = tokio_serial::new(&config.device, config.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(config.flow.into())
        .open_native_async()
        .map_err(|source| DaemonError::OpenPort {
            port: config.device.clone(),
            source,
        })?;

    // the driver may have clamped the requested rate; the write chunk
    // must follow what the port actually runs at
    let mut config = config;
    config.baud = port.baud_rate().map_err(|source| DaemonError::OpenPort {
        port: config.device.clone(),
        source,
    })?;
    info!(device = %config.device, baud = config.baud, "serial port opened");

    let (shutdown_tx, _) = watch::channel(false);
    tokio::spawn(signal::watch_signals(shutdown_tx.clone()));

    let connector = UnixConnector::new(config.socket.clone());
    run_with_io(&config, port, connector, shutdown_tx).await
}

/// Wire the engine and bridge over the given streams and supervise them
///
/// Owns the shutdown channel: whichever task finishes first, the other
/// is told to stop and drained before the result is reported. The
/// engine's verdict outranks the bridge's, so a dying device is never
/// masked by the pipe collapse it causes downstream.
pub async fn run_with_io<T, C>(
    config: &DaemonConfig,
    serial: T,
    connector: C,
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), DaemonError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    C: BusConnector + 'static,
    C::Io: 'static,
{
    let queue = WriteQueue::new();
    let (pipe_tx, pipe_rx) = tokio::io::duplex(PIPE_CAPACITY);

    let engine = TtyEngine::new(
        serial,
        queue.clone(),
        config.write_chunk_size(),
        shutdown_tx.subscribe(),
    );
    let bridge = BusBridge::new(connector, pipe_rx, queue, shutdown_tx.subscribe());

    let mut engine_task = tokio::spawn(engine.run(pipe_tx));
    let mut bridge_task = tokio::spawn(bridge.run());

    let engine_res;
    let bridge_res;
    tokio::select! {
        res = &mut engine_task => {
            let _ = shutdown_tx.send(true);
            engine_res = res?;
            bridge_res = (&mut bridge_task).await?;
        }
        res = &mut bridge_task => {
            let _ = shutdown_tx.send(true);
            bridge_res = res?;
            engine_res = (&mut engine_task).await?;
        }
    }

    debug!("both daemon tasks joined");
    engine_res?;
    bridge_res?;
    Ok(())
}
