//! Daemon configuration

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Baud rates the daemon accepts, matching the termios constants the
/// serial layer can actually program
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    0, 50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115_200, 230_400,
];

/// Default baud rate
pub const DEFAULT_BAUD: u32 = 115_200;

/// One serial write never exceeds a tenth of a second of link time
const WRITE_SZ_DIV: u32 = 10;

/// Floor for the per-write chunk so slow links still make progress
const WRITE_SZ_MIN: usize = 8;

/// Serial flow control mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control
    #[default]
    None,
    /// XON/XOFF software flow control
    Soft,
    /// RTS/CTS hardware flow control
    Hard,
}

impl FromStr for FlowControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(FlowControl::None),
            "s" | "x" | "soft" => Ok(FlowControl::Soft),
            "h" | "hard" => Ok(FlowControl::Hard),
            _ => Err(format!("invalid flow control: {s}")),
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Soft => tokio_serial::FlowControl::Software,
            FlowControl::Hard => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Everything the daemon needs to start
///
/// Parity, data bits and stop bits are fixed (8N1 raw); only what the
/// original flag surface exposed is configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Serial device path
    pub device: String,
    /// Baud rate, validated against [`SUPPORTED_BAUD_RATES`]
    pub baud: u32,
    /// Flow control mode
    pub flow: FlowControl,
    /// Bus socket override; the connector falls back to its default
    pub socket: Option<PathBuf>,
}

impl DaemonConfig {
    /// Config for `device` with default baud, no flow control and the
    /// default bus socket
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud: DEFAULT_BAUD,
            flow: FlowControl::default(),
            socket: None,
        }
    }

    /// Reject unsupported baud rates
    pub fn validate(&self) -> Result<(), DaemonError> {
        if SUPPORTED_BAUD_RATES.contains(&self.baud) {
            Ok(())
        } else {
            Err(DaemonError::InvalidBaud(self.baud))
        }
    }

    /// Bytes per serial write attempt, derived from the baud rate so one
    /// write never stalls the loop disproportionately to link speed
    pub fn write_chunk_size(&self) -> usize {
        ((self.baud / WRITE_SZ_DIV) as usize).max(WRITE_SZ_MIN)
    }
}
