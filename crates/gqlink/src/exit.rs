use std::fmt;
use std::io;

use gqlink_client::{ClientError, ErrorClass};
use gqlink_frame::FrameError;
use gqlink_transport::TransportError;

// Process exit codes. 3 and 60 distinguish link failures from protocol desync.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: &TransportError) -> CliError {
    let code = match err.io_kind() {
        Some(io::ErrorKind::PermissionDenied) => PERMISSION_DENIED,
        Some(io::ErrorKind::TimedOut) => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    let code = match (&err, err.class()) {
        (ClientError::Transport(inner), _) => return transport_error(context, inner),
        // Serial ports never close on their own; no bytes at all means the
        // device did not answer within the read timeout.
        (ClientError::Frame(FrameError::ShortRead { got: 0, .. }), _) => TIMEOUT,
        (ClientError::InvalidReply { .. }, _) => DATA_INVALID,
        (_, ErrorClass::TransportWrite | ErrorClass::TransportRead) => TRANSPORT_ERROR,
        (_, ErrorClass::StreamTerminated) => TRANSPORT_ERROR,
        (_, ErrorClass::ProtocolMismatch) => DATA_INVALID,
        (_, ErrorClass::Usage) => USAGE,
        (_, ErrorClass::Other) => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}
