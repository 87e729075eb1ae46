use std::io::{Read, Write};

/// A blocking duplex byte stream to the device.
///
/// Reads block until at least one byte is available, the stream ends
/// (`Ok(0)`), or the transport's own timeout expires (`TimedOut` /
/// `WouldBlock`). There is no framing at this level.
///
/// `Send + 'static` is required because the heartbeat stream moves the
/// transport onto a background thread for the duration of the stream.
pub trait Transport: Read + Write + Send + 'static {
    /// Short human-readable name for diagnostics.
    fn describe(&self) -> String {
        "stream".to_string()
    }

    /// Drop any bytes the device already sent but nobody has read.
    ///
    /// Called after leaving heartbeat mode so late samples do not corrupt
    /// the next reply. Streams without an input buffer do nothing.
    fn discard_input(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Transport for std::io::Cursor<Vec<u8>> {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn assert_transport<T: Transport>(t: &T) -> String {
        t.describe()
    }

    #[test]
    fn cursor_is_a_transport() {
        let cursor = Cursor::new(Vec::<u8>::new());
        assert_eq!(assert_transport(&cursor), "in-memory");
    }

    #[test]
    fn discard_input_defaults_to_noop() {
        let mut cursor = Cursor::new(vec![1u8, 2]);
        cursor.discard_input().unwrap();
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn cursor_transport_roundtrip() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        cursor.write_all(b"<GETCPM>>").unwrap();
        cursor.set_position(0);

        let mut buf = [0u8; 9];
        cursor.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"<GETCPM>>");
    }
}
