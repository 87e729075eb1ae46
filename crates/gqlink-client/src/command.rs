//! The command catalogue.
//!
//! Each [`Command`] knows its wire template, the parameter bytes it injects,
//! and its [`ReplyContract`]. The contract table is the only place that
//! decides whether a command is followed by a read; reading after a
//! fire-and-forget command would block forever.

use std::io::Read;

use bytes::Bytes;
use gqlink_frame::{decode_ack, decode_fixed, decode_with_trailer, Frame, FrameTemplate, ReplyReader};

/// Reply length of `GETVER`.
pub const VERSION_LEN: usize = 14;
/// Reply length of `GETCPM`.
pub const CPM_LEN: usize = 2;
/// Reply length of `GETVOLT`.
pub const VOLTAGE_LEN: usize = 1;
/// Reply length of `GETCFG`.
pub const CONFIG_LEN: usize = 256;
/// Reply length of `GETSERIAL`.
pub const SERIAL_LEN: usize = 7;
/// Payload length of `GETDATETIME` (trailer excluded).
pub const DATE_TIME_LEN: usize = 6;
/// Payload length of `GETTEMP` (trailer excluded).
pub const TEMPERATURE_LEN: usize = 3;
/// Payload length of `GETGYRO` (trailer excluded).
pub const GYRO_LEN: usize = 6;
/// Size of one heartbeat sample.
pub const HEARTBEAT_SAMPLE_LEN: usize = 2;
/// Highest address reachable with the 3 address bytes of `SPIR`.
pub const MAX_FLASH_ADDRESS: u32 = 0x00FF_FFFF;

const GETVER: FrameTemplate = FrameTemplate::bare("GETVER");
const GETCPM: FrameTemplate = FrameTemplate::bare("GETCPM");
pub(crate) const HEARTBEAT_ON: FrameTemplate = FrameTemplate::bare("HEARTBEAT1");
pub(crate) const HEARTBEAT_OFF: FrameTemplate = FrameTemplate::bare("HEARTBEAT0");
const GETVOLT: FrameTemplate = FrameTemplate::bare("GETVOLT");
const SPIR: FrameTemplate = FrameTemplate::new("SPIR", b"     ");
const GETCFG: FrameTemplate = FrameTemplate::bare("GETCFG");
const ECFG: FrameTemplate = FrameTemplate::bare("ECFG");
const WCFG: FrameTemplate = FrameTemplate::new("WCFG", b"  ");
const CFGUPDATE: FrameTemplate = FrameTemplate::bare("CFGUPDATE");
const KEY: FrameTemplate = FrameTemplate::new("KEY", b" ");
const GETSERIAL: FrameTemplate = FrameTemplate::bare("GETSERIAL");
const POWEROFF: FrameTemplate = FrameTemplate::bare("POWEROFF");
const POWERON: FrameTemplate = FrameTemplate::bare("POWERON");
const REBOOT: FrameTemplate = FrameTemplate::bare("REBOOT");
const FACTORYRESET: FrameTemplate = FrameTemplate::bare("FACTORYRESET");
const SETDATE: FrameTemplate = FrameTemplate::new("SETDATE", b"   ");
const SETTIME: FrameTemplate = FrameTemplate::new("SETTIME", b"   ");
const SETDATETIME: FrameTemplate = FrameTemplate::new("SETDATETIME", b"YMDHMS");
const GETDATETIME: FrameTemplate = FrameTemplate::bare("GETDATETIME");
const GETTEMP: FrameTemplate = FrameTemplate::bare("GETTEMP");
const GETGYRO: FrameTemplate = FrameTemplate::bare("GETGYRO");

/// What the device sends back after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyContract {
    /// Nothing. The command is fire-and-forget.
    None,
    /// A single `0xAA` byte.
    Ack,
    /// Exactly `n` bytes, no trailer.
    Fixed(usize),
    /// Up to `n` bytes; whatever arrived before the line went quiet.
    UpTo(usize),
    /// `n` payload bytes followed by a `0xAA` trailer.
    Trailer(usize),
}

impl ReplyContract {
    /// Number of bytes this contract reads from the wire, at most.
    pub fn wire_len(&self) -> usize {
        match *self {
            ReplyContract::None => 0,
            ReplyContract::Ack => 1,
            ReplyContract::Fixed(n) | ReplyContract::UpTo(n) => n,
            ReplyContract::Trailer(n) => n + 1,
        }
    }

    /// Read and validate a reply, returning the payload with any trailer
    /// stripped. Ack-only and fire-and-forget replies yield no bytes.
    pub fn read_reply<R: Read>(&self, reader: &mut ReplyReader<R>) -> gqlink_frame::Result<Bytes> {
        match *self {
            ReplyContract::None => Ok(Bytes::new()),
            ReplyContract::Ack => {
                let reply = reader.read_exact(1)?;
                decode_ack(&reply)?;
                Ok(Bytes::new())
            }
            ReplyContract::Fixed(n) => {
                let reply = reader.read_exact(n)?;
                decode_fixed(&reply, n)?;
                Ok(reply)
            }
            ReplyContract::UpTo(n) => reader.read_up_to(n),
            ReplyContract::Trailer(n) => {
                let reply = reader.read_exact(n + 1)?;
                let len = decode_with_trailer(&reply, n)?.len();
                Ok(reply.slice(..len))
            }
        }
    }
}

/// One field of the device clock, settable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl ClockField {
    /// Selector byte written twice before the value.
    pub fn tag(self) -> u8 {
        match self {
            ClockField::Year => b'Y',
            ClockField::Month => b'M',
            ClockField::Day => b'D',
            ClockField::Hour => b'H',
            ClockField::Minute => b'M',
            ClockField::Second => b'S',
        }
    }

    /// True for the fields carried by `SETDATE` rather than `SETTIME`.
    pub fn is_date(self) -> bool {
        matches!(self, ClockField::Year | ClockField::Month | ClockField::Day)
    }
}

/// A request the device understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Firmware model and version string.
    GetVersion,
    /// Current counts per minute.
    GetCpm,
    /// Start pushing a 2-byte count every second.
    HeartbeatOn,
    /// Stop pushing heartbeat samples.
    HeartbeatOff,
    /// Battery voltage.
    GetVoltage,
    /// Read `length` bytes of history flash starting at a 24-bit `address`.
    ReadFlash { address: u32, length: u16 },
    /// Dump the 256-byte configuration block.
    GetConfig,
    /// Erase the configuration block.
    EraseConfig,
    /// Write one configuration byte.
    WriteConfig { address: u8, data: u8 },
    /// Reload the configuration block after writes.
    ConfigUpdate,
    /// Simulate a front-panel key press (0..=3).
    Key(u8),
    /// 7-byte serial number.
    GetSerial,
    /// Power the unit off.
    PowerOff,
    /// Power the unit on.
    PowerOn,
    /// Restart the unit.
    Reboot,
    /// Restore factory settings.
    FactoryReset,
    /// Set a single clock field to a raw byte value.
    SetClockField { field: ClockField, value: u8 },
    /// Set the whole clock: year − 2000, month, day, hour, minute, second.
    SetDateTime([u8; 6]),
    /// Read the clock.
    GetDateTime,
    /// Internal temperature.
    GetTemperature,
    /// Gyroscope axes.
    GetGyro,
}

impl Command {
    /// The frame template this command is sent with.
    pub fn template(&self) -> FrameTemplate {
        match self {
            Command::GetVersion => GETVER,
            Command::GetCpm => GETCPM,
            Command::HeartbeatOn => HEARTBEAT_ON,
            Command::HeartbeatOff => HEARTBEAT_OFF,
            Command::GetVoltage => GETVOLT,
            Command::ReadFlash { .. } => SPIR,
            Command::GetConfig => GETCFG,
            Command::EraseConfig => ECFG,
            Command::WriteConfig { .. } => WCFG,
            Command::ConfigUpdate => CFGUPDATE,
            Command::Key(_) => KEY,
            Command::GetSerial => GETSERIAL,
            Command::PowerOff => POWEROFF,
            Command::PowerOn => POWERON,
            Command::Reboot => REBOOT,
            Command::FactoryReset => FACTORYRESET,
            Command::SetClockField { field, .. } if field.is_date() => SETDATE,
            Command::SetClockField { .. } => SETTIME,
            Command::SetDateTime(_) => SETDATETIME,
            Command::GetDateTime => GETDATETIME,
            Command::GetTemperature => GETTEMP,
            Command::GetGyro => GETGYRO,
        }
    }

    /// Wire mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        self.template().mnemonic
    }

    /// Parameter bytes, in placeholder order.
    pub fn params(&self) -> Vec<u8> {
        match *self {
            Command::ReadFlash { address, length } => {
                let [_, a2, a1, a0] = address.to_be_bytes();
                let [l1, l0] = length.to_be_bytes();
                vec![a2, a1, a0, l1, l0]
            }
            Command::WriteConfig { address, data } => vec![address, data],
            Command::Key(key) => vec![key],
            Command::SetClockField { field, value } => vec![field.tag(), field.tag(), value],
            Command::SetDateTime(fields) => fields.to_vec(),
            _ => Vec::new(),
        }
    }

    /// What the device replies with.
    pub fn reply(&self) -> ReplyContract {
        match *self {
            Command::GetVersion => ReplyContract::UpTo(VERSION_LEN),
            Command::GetCpm => ReplyContract::Fixed(CPM_LEN),
            Command::GetVoltage => ReplyContract::Fixed(VOLTAGE_LEN),
            Command::ReadFlash { length, .. } => ReplyContract::Fixed(usize::from(length)),
            Command::GetConfig => ReplyContract::Fixed(CONFIG_LEN),
            Command::GetSerial => ReplyContract::Fixed(SERIAL_LEN),
            // Ack for ECFG/WCFG/CFGUPDATE has not been confirmed on hardware.
            Command::EraseConfig
            | Command::WriteConfig { .. }
            | Command::ConfigUpdate
            | Command::FactoryReset
            | Command::SetClockField { .. }
            | Command::SetDateTime(_) => ReplyContract::Ack,
            Command::GetDateTime => ReplyContract::Trailer(DATE_TIME_LEN),
            Command::GetTemperature => ReplyContract::Trailer(TEMPERATURE_LEN),
            Command::GetGyro => ReplyContract::Trailer(GYRO_LEN),
            Command::HeartbeatOn
            | Command::HeartbeatOff
            | Command::Key(_)
            | Command::PowerOff
            | Command::PowerOn
            | Command::Reboot => ReplyContract::None,
        }
    }

    /// Encode the request frame.
    pub fn encode(&self) -> gqlink_frame::Result<Frame> {
        self.template().encode(&self.params())
    }
}
