//! Serial transport abstraction for GQ GMC radiation monitors.
//!
//! The protocol layers above only need a blocking duplex byte stream. This
//! crate names that capability ([`Transport`]) and provides the one
//! implementation used in practice: a serial port opened at a fixed baud
//! rate with no parity ([`SerialStream`]).
//!
//! This is the lowest layer of gqlink. Everything else builds on top of
//! the [`Transport`] trait defined here.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialStream, DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use traits::Transport;
