/// Errors that can occur while exchanging frames with the device.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Writing the request frame to the transport failed.
    #[error("transport write failed: {0}")]
    Write(#[source] std::io::Error),

    /// Reading the reply from the transport failed.
    #[error("transport read failed: {0}")]
    Read(#[source] std::io::Error),

    /// The transport went quiet or closed before the reply was complete.
    #[error("short read (expected {expected} bytes, got {got})")]
    ShortRead { expected: usize, got: usize },

    /// An acknowledgement-only reply was not the `0xAA` sentinel.
    #[error("unexpected acknowledgement 0x{got:02X} (expected 0xAA)")]
    UnexpectedAck { got: u8 },

    /// The trailer byte after a reply payload was not the `0xAA` sentinel.
    #[error("unexpected trailer 0x{got:02X} (expected 0xAA)")]
    UnexpectedTrailer { got: u8 },

    /// The caller supplied the wrong number of parameter bytes for a frame.
    #[error("{mnemonic} takes {expected} parameter bytes, got {got}")]
    InvalidParams {
        mnemonic: &'static str,
        expected: usize,
        got: usize,
    },
}

impl FrameError {
    /// True for `UnexpectedAck` / `UnexpectedTrailer`: the device answered,
    /// but not with the sentinel the exchange requires.
    pub fn is_sentinel_mismatch(&self) -> bool {
        matches!(
            self,
            FrameError::UnexpectedAck { .. } | FrameError::UnexpectedTrailer { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
