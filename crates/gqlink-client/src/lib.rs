//! Command set, heartbeat streaming and client facade for GQ GMC devices.
//!
//! This is the "just works" layer. Open a device, call one method per
//! operation, and get typed measurements back. The heartbeat stream runs on
//! a background thread and always returns the device to its normal mode
//! when it ends.

pub mod client;
pub mod command;
pub mod error;
pub mod heartbeat;
pub mod values;

#[cfg(test)]
mod mock;

pub use client::Client;
pub use command::{ClockField, Command, ReplyContract};
pub use error::{ClientError, ErrorClass, Result};
pub use heartbeat::{
    Heartbeat, HeartbeatCanceller, HeartbeatConfig, HeartbeatReport, Termination,
    DEFAULT_QUEUE_CAPACITY,
};
pub use values::{
    decode_cpm, decode_date_time, decode_heartbeat_sample, decode_temperature, decode_voltage,
    encode_date_time, FirmwareVersion, Gyroscope, SerialNumber,
};
