use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::preview_bytes;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;
const READ_CHUNK_SIZE: usize = 1024;

enum Fill {
    Complete,
    Quiet,
    Closed,
}

/// Reads fixed-length replies from any `Read` stream.
///
/// Replies on this protocol carry no length prefix, so the caller always
/// says how many bytes it expects. The reader never consumes more than that,
/// which keeps the next reply on the wire intact.
///
/// A transport timeout (`TimedOut` / `WouldBlock`) means "the line went
/// quiet": it is a short read for [`read_exact`](Self::read_exact), the end
/// of the reply for [`read_up_to`](Self::read_up_to), and "nothing yet" for
/// [`poll_exact`](Self::poll_exact).
pub struct ReplyReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> ReplyReader<T> {
    /// Create a new reply reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read exactly `len` bytes (blocking).
    ///
    /// Returns `FrameError::ShortRead` when the stream ends or times out
    /// first. Partial bytes are discarded with the failed exchange.
    pub fn read_exact(&mut self, len: usize) -> Result<Bytes> {
        match self.fill_to(len)? {
            Fill::Complete => Ok(self.take(len)),
            Fill::Quiet | Fill::Closed => {
                let got = self.buf.len();
                self.buf.clear();
                Err(FrameError::ShortRead { expected: len, got })
            }
        }
    }

    /// Read at most `len` bytes, stopping early once the line goes quiet.
    ///
    /// At least one byte must arrive, otherwise this is a short read.
    pub fn read_up_to(&mut self, len: usize) -> Result<Bytes> {
        match self.fill_to(len)? {
            Fill::Complete => Ok(self.take(len)),
            Fill::Quiet | Fill::Closed if !self.buf.is_empty() => {
                let got = self.buf.len();
                Ok(self.take(got))
            }
            Fill::Quiet | Fill::Closed => Err(FrameError::ShortRead {
                expected: len,
                got: 0,
            }),
        }
    }

    /// Try to complete a `len`-byte read.
    ///
    /// Returns `Ok(None)` when the transport timed out before the read was
    /// complete; bytes received so far stay buffered for the next call. The
    /// end of the stream is still a short read.
    pub fn poll_exact(&mut self, len: usize) -> Result<Option<Bytes>> {
        match self.fill_to(len)? {
            Fill::Complete => Ok(Some(self.take(len))),
            Fill::Quiet => Ok(None),
            Fill::Closed => {
                let got = self.buf.len();
                self.buf.clear();
                Err(FrameError::ShortRead { expected: len, got })
            }
        }
    }

    /// Number of bytes received but not yet returned.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Any partially received reply is dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn fill_to(&mut self, len: usize) -> Result<Fill> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while self.buf.len() < len {
            let want = (len - self.buf.len()).min(READ_CHUNK_SIZE);
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Ok(Fill::Closed),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_quiet(&err) => return Ok(Fill::Quiet),
                Err(err) => return Err(FrameError::Read(err)),
            }
        }
        Ok(Fill::Complete)
    }

    fn take(&mut self, len: usize) -> Bytes {
        let reply = self.buf.split_to(len).freeze();
        trace!(len, reply = %preview_bytes(&reply), "reply bytes");
        reply
    }
}

fn is_quiet(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}
