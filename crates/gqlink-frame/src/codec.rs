use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Acknowledgement sentinel: the whole reply of ack-only commands, and the
/// trailer byte of replies that carry one.
pub const ACK: u8 = 0xAA;

/// First byte of every request frame.
pub const FRAME_START: u8 = b'<';

/// Last two bytes of every request frame.
pub const FRAME_END: [u8; 2] = *b">>";

/// The literal layout of one request frame.
///
/// ```text
/// ┌─────┬──────────────┬──────────────────────┬──────┐
/// │ '<' │ MNEMONIC     │ placeholder (N bytes) │ ">>" │
/// └─────┴──────────────┴──────────────────────┴──────┘
/// ```
///
/// Parameter byte `i` overwrites placeholder byte `i`, i.e. it lands at
/// offset `1 + mnemonic.len() + i`. Bytes outside the placeholder are never
/// touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTemplate {
    /// ASCII command mnemonic, e.g. `GETCPM`.
    pub mnemonic: &'static str,
    /// Literal bytes reserved for parameters.
    pub placeholder: &'static [u8],
}

impl FrameTemplate {
    /// A template whose parameters overwrite `placeholder`.
    pub const fn new(mnemonic: &'static str, placeholder: &'static [u8]) -> Self {
        Self {
            mnemonic,
            placeholder,
        }
    }

    /// A template without parameters.
    pub const fn bare(mnemonic: &'static str) -> Self {
        Self::new(mnemonic, b"")
    }

    /// Number of parameter bytes the frame reserves.
    pub const fn param_count(&self) -> usize {
        self.placeholder.len()
    }

    /// Byte offset of parameter `index` within the encoded frame.
    pub const fn param_offset(&self, index: usize) -> usize {
        1 + self.mnemonic.len() + index
    }

    /// Total encoded size in bytes.
    pub const fn wire_size(&self) -> usize {
        1 + self.mnemonic.len() + self.placeholder.len() + FRAME_END.len()
    }

    /// The frame with every placeholder byte left in place.
    pub fn literal(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        put_literal(self, &mut dst);
        dst.freeze()
    }

    /// Encode this template with `params` into a standalone [`Frame`].
    pub fn encode(&self, params: &[u8]) -> Result<Frame> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, params, &mut dst)?;
        Ok(Frame {
            mnemonic: self.mnemonic,
            bytes: dst.freeze(),
        })
    }
}

/// An encoded request, ready to be written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Mnemonic the frame was built from (for diagnostics).
    pub mnemonic: &'static str,
    /// The exact bytes sent on the wire.
    pub bytes: Bytes,
}

impl Frame {
    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }

    /// Printable rendering of the frame: ASCII as-is, other bytes as `\xNN`.
    pub fn preview(&self) -> String {
        preview_bytes(&self.bytes)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

/// Encode a request frame into `dst`.
///
/// `params` must supply exactly the number of bytes the template reserves.
pub fn encode_frame(template: &FrameTemplate, params: &[u8], dst: &mut BytesMut) -> Result<()> {
    if params.len() != template.param_count() {
        return Err(FrameError::InvalidParams {
            mnemonic: template.mnemonic,
            expected: template.param_count(),
            got: params.len(),
        });
    }

    let start = dst.len();
    put_literal(template, dst);
    for (index, &byte) in params.iter().enumerate() {
        dst[start + template.param_offset(index)] = byte;
    }
    Ok(())
}

fn put_literal(template: &FrameTemplate, dst: &mut BytesMut) {
    dst.reserve(template.wire_size());
    dst.put_u8(FRAME_START);
    dst.put_slice(template.mnemonic.as_bytes());
    dst.put_slice(template.placeholder);
    dst.put_slice(&FRAME_END);
}

/// Take the first `expected` bytes of a reply without a trailer.
pub fn decode_fixed(reply: &[u8], expected: usize) -> Result<&[u8]> {
    reply.get(..expected).ok_or(FrameError::ShortRead {
        expected,
        got: reply.len(),
    })
}

/// Validate the trailer after `payload_len` payload bytes and strip it.
pub fn decode_with_trailer(reply: &[u8], payload_len: usize) -> Result<&[u8]> {
    let framed = decode_fixed(reply, payload_len + 1)?;
    let (payload, trailer) = framed.split_at(payload_len);
    match trailer[0] {
        ACK => Ok(payload),
        got => Err(FrameError::UnexpectedTrailer { got }),
    }
}

/// Validate a one-byte acknowledgement reply.
pub fn decode_ack(reply: &[u8]) -> Result<()> {
    match decode_fixed(reply, 1)?[0] {
        ACK => Ok(()),
        got => Err(FrameError::UnexpectedAck { got }),
    }
}

pub(crate) fn preview_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIR: FrameTemplate = FrameTemplate::new("SPIR", b"     ");
    const SET_DATE_TIME: FrameTemplate = FrameTemplate::new("SETDATETIME", b"YMDHMS");

    #[test]
    fn bare_frame_literal() {
        let frame = FrameTemplate::bare("GETCPM").encode(&[]).unwrap();
        assert_eq!(frame.bytes.as_ref(), b"<GETCPM>>");
        assert_eq!(frame.wire_size(), 9);
    }

    #[test]
    fn params_land_at_fixed_offsets() {
        let frame = SPIR.encode(&[0x01, 0x02, 0x03, 0x10, 0x00]).unwrap();

        assert_eq!(frame.wire_size(), 12);
        assert_eq!(&frame.bytes[..5], b"<SPIR");
        assert_eq!(&frame.bytes[5..10], &[0x01, 0x02, 0x03, 0x10, 0x00]);
        assert_eq!(&frame.bytes[10..], b">>");
        for i in 0..5 {
            assert_eq!(SPIR.param_offset(i), 5 + i);
        }
    }

    #[test]
    fn only_placeholder_bytes_change() {
        let params = [24, 3, 15, 9, 5, 0];
        let literal = SET_DATE_TIME.literal();
        let frame = SET_DATE_TIME.encode(&params).unwrap();

        assert_eq!(literal.as_ref(), b"<SETDATETIMEYMDHMS>>");
        assert_eq!(frame.wire_size(), literal.len());
        for (offset, (&got, &lit)) in frame.bytes.iter().zip(literal.iter()).enumerate() {
            if (12..18).contains(&offset) {
                assert_eq!(got, params[offset - 12]);
            } else {
                assert_eq!(got, lit, "byte {offset} changed");
            }
        }
    }

    #[test]
    fn wrong_param_count_rejected() {
        let err = SPIR.encode(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidParams {
                mnemonic: "SPIR",
                expected: 5,
                got: 3
            }
        ));

        let err = FrameTemplate::bare("GETVER").encode(&[0]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidParams { expected: 0, .. }));
    }

    #[test]
    fn encode_appends_to_existing_buffer() {
        let mut dst = BytesMut::from(&b"xx"[..]);
        encode_frame(&FrameTemplate::new("KEY", b" "), &[2], &mut dst).unwrap();
        assert_eq!(dst.as_ref(), b"xx<KEY\x02>>");
    }

    #[test]
    fn decode_fixed_takes_prefix() {
        assert_eq!(decode_fixed(&[1, 2, 3], 2).unwrap(), &[1, 2]);
        assert!(matches!(
            decode_fixed(&[1], 2),
            Err(FrameError::ShortRead {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn trailer_accepted_only_when_ack() {
        let payload = decode_with_trailer(&[25, 30, 0, ACK], 3).unwrap();
        assert_eq!(payload, &[25, 30, 0]);

        for trailer in (0u8..=255).filter(|b| *b != ACK) {
            let err = decode_with_trailer(&[25, 30, 0, trailer], 3).unwrap_err();
            assert!(matches!(err, FrameError::UnexpectedTrailer { got } if got == trailer));
        }
    }

    #[test]
    fn trailer_missing_is_short_read() {
        let err = decode_with_trailer(&[25, 30, 0], 3).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn ack_validation() {
        decode_ack(&[ACK]).unwrap();
        assert!(matches!(
            decode_ack(&[0x55]),
            Err(FrameError::UnexpectedAck { got: 0x55 })
        ));
        assert!(matches!(
            decode_ack(&[]),
            Err(FrameError::ShortRead {
                expected: 1,
                got: 0
            })
        ));
    }

    #[test]
    fn preview_escapes_binary() {
        let frame = FrameTemplate::new("KEY", b" ").encode(&[3]).unwrap();
        assert_eq!(frame.preview(), "<KEY\\x03>>");
        assert_eq!(frame.to_string(), "<KEY\\x03>>");
    }
}
