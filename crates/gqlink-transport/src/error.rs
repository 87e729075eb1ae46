use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: serialport::Error,
    },

    /// The device was opened but rejected a line setting.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: serialport::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The I/O error kind behind this error, when there is one.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            TransportError::Open { source, .. } | TransportError::Configure { source, .. } => {
                match source.kind() {
                    serialport::ErrorKind::Io(kind) => Some(kind),
                    serialport::ErrorKind::NoDevice => Some(std::io::ErrorKind::NotFound),
                    _ => None,
                }
            }
            TransportError::Io(err) => Some(err.kind()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn io_kind_of_wrapped_errors() {
        let err = TransportError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::PermissionDenied));

        let err = TransportError::Open {
            path: PathBuf::from("/dev/ttyUSB9"),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
        };
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("failed to open /dev/ttyUSB9"));

        let err = TransportError::Configure {
            path: PathBuf::from("/dev/ttyUSB0"),
            source: serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad baud"),
        };
        assert_eq!(err.io_kind(), None);
    }
}
