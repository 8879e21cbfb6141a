//! seriald - serial to message bus bridge
//!
//! Attaches to one serial device and relays traffic in both directions:
//! complete lines read from the device are published as bus events, and
//! the registered bus object accepts `send` calls that queue data for
//! the device.

use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seriald_core::config::DEFAULT_BAUD;
use seriald_core::{DaemonConfig, FlowControl, SUPPORTED_BAUD_RATES};

#[derive(Debug, Parser)]
#[command(name = "seriald", version, about = "Bridge a serial device onto the local message bus")]
struct Cli {
    /// Baud rate for the serial link
    #[arg(short = 'b', long = "baud", default_value_t = DEFAULT_BAUD, value_parser = parse_baud)]
    baud: u32,

    /// Flow control: none, soft (XON/XOFF) or hard (RTS/CTS)
    #[arg(short = 'f', long = "flow", default_value = "none", value_parser = FlowControl::from_str)]
    flow: FlowControl,

    /// Bus socket path, if not the system default
    #[arg(short = 's', long = "socket")]
    socket: Option<PathBuf>,

    /// Serial device to bridge
    device: String,
}

fn parse_baud(s: &str) -> Result<u32, String> {
    let baud: u32 = s
        .parse()
        .map_err(|_| format!("invalid baud rate: {s}"))?;
    if SUPPORTED_BAUD_RATES.contains(&baud) {
        Ok(baud)
    } else {
        Err(format!("unsupported baud rate: {baud}"))
    }
}

impl Cli {
    fn into_config(self) -> DaemonConfig {
        let mut config = DaemonConfig::new(self.device);
        config.baud = self.baud;
        config.flow = self.flow;
        config.socket = self.socket;
        config
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seriald=info,seriald_core=info,seriald_bus=info,seriald_framing=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.into_config();
    info!(device = %config.device, baud = config.baud, "starting seriald");

    if let Err(e) = seriald_core::run(config).await {
        error!(error = %e, "daemon failed");
        // pause before exiting so a supervising init does not respawn
        // the daemon in a tight loop against a broken device
        tokio::time::sleep(Duration::from_secs(1)).await;
        process::exit(1);
    }

    info!("seriald stopped");
}
