use std::sync::Arc;

use gqlink_frame::FrameError;
use gqlink_transport::TransportError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Opening or configuring the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A command exchange failed (write, read, short read, ack/trailer).
    #[error("{0}")]
    Frame(#[from] FrameError),

    /// The heartbeat stream ended because a sample read failed.
    #[error("heartbeat stream terminated: {source}")]
    StreamTerminated { source: Arc<FrameError> },

    /// Sending the heartbeat-off command after the stream ended failed.
    ///
    /// The device may still be pushing samples.
    #[error("failed to leave heartbeat mode: {0}")]
    HeartbeatCleanup(#[source] Arc<FrameError>),

    /// An argument is outside what the device accepts. Nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The device answered with bytes that do not form a valid value.
    #[error("invalid {command} reply: {detail}")]
    InvalidReply {
        command: &'static str,
        detail: String,
    },

    /// The client has been closed.
    #[error("client closed")]
    Closed,
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request could not be written.
    TransportWrite,
    /// The reply could not be read, or was shorter than required.
    TransportRead,
    /// The device answered but the sentinel byte did not match.
    ProtocolMismatch,
    /// The heartbeat stream ended on a read failure.
    StreamTerminated,
    /// Bad arguments or use of a closed client.
    Usage,
    /// Everything else (opening the port, undecodable values).
    Other,
}

impl ClientError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Frame(err) => frame_class(err),
            ClientError::HeartbeatCleanup(err) => frame_class(err),
            ClientError::StreamTerminated { .. } => ErrorClass::StreamTerminated,
            ClientError::InvalidArgument(_) | ClientError::Closed => ErrorClass::Usage,
            ClientError::Transport(_) | ClientError::InvalidReply { .. } => ErrorClass::Other,
        }
    }
}

fn frame_class(err: &FrameError) -> ErrorClass {
    match err {
        FrameError::Write(_) => ErrorClass::TransportWrite,
        FrameError::Read(_) | FrameError::ShortRead { .. } => ErrorClass::TransportRead,
        FrameError::UnexpectedAck { .. } | FrameError::UnexpectedTrailer { .. } => {
            ErrorClass::ProtocolMismatch
        }
        FrameError::InvalidParams { .. } => ErrorClass::Usage,
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
