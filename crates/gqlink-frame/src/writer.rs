use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, preview_bytes, Frame, FrameTemplate};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 32;

/// Writes complete request frames to any `Write` stream.
pub struct CommandWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> CommandWriter<T> {
    /// Create a new command writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write an already encoded frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        debug!(mnemonic = frame.mnemonic, frame = %frame, "sending frame");
        self.write_all(&frame.bytes)
    }

    /// Encode a template with its parameters and send it.
    pub fn send(&mut self, template: &FrameTemplate, params: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(template, params, &mut self.buf)?;
        debug!(
            mnemonic = template.mnemonic,
            frame = %preview_bytes(&self.buf),
            "sending frame"
        );

        let frame = self.buf.split().freeze();
        self.write_all(&frame)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Write(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(FrameError::Write(std::io::Error::from(
                        ErrorKind::WriteZero,
                    )))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Write(err)),
            }
        }

        self.flush()
    }
}
