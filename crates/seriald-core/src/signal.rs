//! Signal handling
//!
//! SIGTERM requests an orderly shutdown through the watch channel every
//! task already selects on. The usual nuisance signals are claimed and
//! swallowed so a stray SIGHUP or SIGUSR1 cannot kill the daemon.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::DaemonError;

/// Run until SIGTERM, then flip the shutdown flag
///
/// Every other catchable signal of interest is drained and logged
/// without effect. The task itself exits once shutdown is signalled.
pub async fn watch_signals(shutdown: watch::Sender<bool>) -> Result<(), DaemonError> {
    let mut term = signal(SignalKind::terminate())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut alrm = signal(SignalKind::alarm())?;
    let mut pipe = signal(SignalKind::pipe())?;
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;

    loop {
        tokio::select! {
            _ = term.recv() => {
                info!("SIGTERM received, shutting down");
                let _ = shutdown.send(true);
                return Ok(());
            }
            _ = hup.recv() => debug!(signal = "SIGHUP", "ignoring signal"),
            _ = int.recv() => debug!(signal = "SIGINT", "ignoring signal"),
            _ = quit.recv() => debug!(signal = "SIGQUIT", "ignoring signal"),
            _ = alrm.recv() => debug!(signal = "SIGALRM", "ignoring signal"),
            _ = pipe.recv() => debug!(signal = "SIGPIPE", "ignoring signal"),
            _ = usr1.recv() => debug!(signal = "SIGUSR1", "ignoring signal"),
            _ = usr2.recv() => debug!(signal = "SIGUSR2", "ignoring signal"),
        }
    }
}
