//! Bracketed command framing and reply decoding for the GQ GMC protocol.
//!
//! Requests are ASCII frames of the form `<MNEMONIC...>>`. Parameters are raw
//! bytes written at fixed offsets inside the frame, not formatted text.
//! Replies carry no framing at all: their length is fixed by the command,
//! and some of them end with a single `0xAA` trailer byte.
//!
//! This crate centralises every length and sentinel-byte assumption so that
//! a command handler is one encode plus one decode.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_ack, decode_fixed, decode_with_trailer, encode_frame, Frame, FrameTemplate, ACK,
    FRAME_END, FRAME_START,
};
pub use error::{FrameError, Result};
pub use reader::ReplyReader;
pub use writer::CommandWriter;
