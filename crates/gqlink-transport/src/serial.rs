use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use serialport::Parity;
use serialport::{DataBits, FlowControl, SerialPort, StopBits};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Device path used when none is configured.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Line speed of the GMC-300E+/320+/500+ USB serial bridge.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read timeout applied to the port.
///
/// The protocol itself has no timeouts; this is the only thing that bounds
/// how long a read against a silent device can block.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Line settings for opening the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: PathBuf,
    /// Baud rate. Default: 115200.
    pub baud_rate: u32,
    /// Parity. The device speaks 8N1, so this is `Parity::None` unless a
    /// bridge needs something else.
    pub parity: Parity,
    /// Per-read timeout on the port. Default: 3 s.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PORT),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Default settings for a device at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Override the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the parity.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Override the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open serial connection to the device.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
    path: PathBuf,
}

impl SerialStream {
    /// Open the device described by `config` (blocking).
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let path = config.path.clone();
        let port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(config.parity)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        info!(
            ?path,
            baud_rate = config.baud_rate,
            parity = ?config.parity,
            "opened serial device"
        );

        Ok(Self { port, path })
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialStream {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn discard_input(&mut self) -> std::io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(std::io::Error::from)
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("path", &self.path)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_device() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.path, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn builder_overrides() {
        let cfg = SerialConfig::new("/dev/ttyACM1")
            .with_baud_rate(57_600)
            .with_timeout(Duration::from_millis(250));

        assert_eq!(cfg.path, PathBuf::from("/dev/ttyACM1"));
        assert_eq!(cfg.baud_rate, 57_600);
        assert_eq!(cfg.timeout, Duration::from_millis(250));
        assert_eq!(cfg.parity, Parity::None);
    }

    #[test]
    fn open_missing_device_reports_path() {
        let cfg = SerialConfig::new("/nonexistent/gqlink-test-tty");
        let err = SerialStream::open(&cfg).unwrap_err();
        match err {
            TransportError::Open { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/gqlink-test-tty"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
