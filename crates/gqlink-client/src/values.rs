//! Typed measurements decoded from reply payloads.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Serialize, Serializer};

use crate::command::{
    CPM_LEN, DATE_TIME_LEN, GYRO_LEN, HEARTBEAT_SAMPLE_LEN, SERIAL_LEN, TEMPERATURE_LEN,
    VOLTAGE_LEN,
};
use crate::error::{ClientError, Result};

/// Earliest year the device clock can hold.
pub const MIN_YEAR: i32 = 2000;
/// Latest year the device clock can hold (one byte of offset).
pub const MAX_YEAR: i32 = MIN_YEAR + u8::MAX as i32;

/// Top two bits of the first heartbeat byte are not part of the count.
const HEARTBEAT_MASK: u8 = 0x3F;

fn exact<'a, const N: usize>(command: &'static str, payload: &'a [u8]) -> Result<&'a [u8; N]> {
    payload.try_into().map_err(|_| ClientError::InvalidReply {
        command,
        detail: format!("expected {N} bytes, got {}", payload.len()),
    })
}

/// Counts per minute: big-endian u16.
pub fn decode_cpm(payload: &[u8]) -> Result<u16> {
    let bytes = exact::<CPM_LEN>("GETCPM", payload)?;
    Ok(u16::from_be_bytes(*bytes))
}

/// One heartbeat sample: counts in the last second.
pub fn decode_heartbeat_sample(payload: &[u8]) -> Result<u16> {
    let [hi, lo] = *exact::<HEARTBEAT_SAMPLE_LEN>("HEARTBEAT1", payload)?;
    Ok(heartbeat_count(hi, lo))
}

pub(crate) fn heartbeat_count(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi & HEARTBEAT_MASK, lo])
}

/// Battery voltage in volts: one byte of tenths.
pub fn decode_voltage(payload: &[u8]) -> Result<f32> {
    let [tenths] = *exact::<VOLTAGE_LEN>("GETVOLT", payload)?;
    Ok(f32::from(tenths) / 10.0)
}

/// Temperature in °C: integer part, hundredths, and a sign byte (non-zero
/// means negative).
pub fn decode_temperature(payload: &[u8]) -> Result<f32> {
    let [whole, hundredths, sign] = *exact::<TEMPERATURE_LEN>("GETTEMP", payload)?;
    let magnitude = f32::from(whole) + f32::from(hundredths) / 100.0;
    Ok(if sign != 0 { -magnitude } else { magnitude })
}

/// Device clock: year − 2000, month, day, hour, minute, second.
///
/// The device has no notion of time zone; the value is reported as UTC.
pub fn decode_date_time(payload: &[u8]) -> Result<DateTime<Utc>> {
    let [year, month, day, hour, minute, second] =
        *exact::<DATE_TIME_LEN>("GETDATETIME", payload)?;
    let naive = NaiveDate::from_ymd_opt(MIN_YEAR + i32::from(year), month.into(), day.into())
        .and_then(|date| date.and_hms_opt(hour.into(), minute.into(), second.into()))
        .ok_or_else(|| ClientError::InvalidReply {
            command: "GETDATETIME",
            detail: format!(
                "not a calendar date: {year:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ),
        })?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Parameter bytes for `SETDATETIME`.
pub fn encode_date_time(value: &NaiveDateTime) -> Result<[u8; 6]> {
    let year = year_offset(value.year())?;
    // chrono guarantees the remaining fields fit in a byte.
    Ok([
        year,
        value.month() as u8,
        value.day() as u8,
        value.hour() as u8,
        value.minute() as u8,
        value.second() as u8,
    ])
}

pub(crate) fn year_offset(year: i32) -> Result<u8> {
    u8::try_from(year - MIN_YEAR).map_err(|_| {
        ClientError::InvalidArgument(format!(
            "year {year} outside the device range {MIN_YEAR}..={MAX_YEAR}"
        ))
    })
}

/// Firmware identification as reported by `GETVER`, e.g. `GMC-320Re 4.22`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    /// The reply text exactly as received, padding included.
    pub text: String,
    /// Bytes the device actually sent (at most 14).
    pub len: usize,
}

impl FirmwareVersion {
    pub fn from_reply(payload: &[u8]) -> Self {
        Self {
            text: String::from_utf8_lossy(payload).into_owned(),
            len: payload.len(),
        }
    }

    /// The text without trailing NUL or whitespace padding.
    pub fn trimmed(&self) -> &str {
        self.text.trim_end_matches(['\0', ' ', '\r', '\n'])
    }

    /// Model part, e.g. `GMC-320`.
    pub fn model(&self) -> &str {
        let text = self.trimmed();
        match text.split_once("Re") {
            Some((model, _)) => model.trim(),
            None => text.trim(),
        }
    }

    /// Firmware revision, e.g. `4.22`, when the reply carries one.
    pub fn revision(&self) -> Option<&str> {
        self.trimmed()
            .split_once("Re")
            .map(|(_, rev)| rev.trim())
            .filter(|rev| !rev.is_empty())
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Raw gyroscope reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gyroscope {
    pub x: u16,
    pub y: u16,
    pub z: u16,
    /// The six payload bytes as received.
    pub raw: [u8; GYRO_LEN],
}

impl fmt::Display for Gyroscope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={} y={} z={}", self.x, self.y, self.z)
    }
}

impl Gyroscope {
    pub fn from_reply(payload: &[u8]) -> Result<Self> {
        let raw = *exact::<GYRO_LEN>("GETGYRO", payload)?;
        Ok(Self {
            x: u16::from_be_bytes([raw[0], raw[1]]),
            y: u16::from_be_bytes([raw[2], raw[3]]),
            z: u16::from_be_bytes([raw[4], raw[5]]),
            raw,
        })
    }
}

/// The 7-byte device serial number. Displays and serializes as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialNumber(pub [u8; SERIAL_LEN]);

impl SerialNumber {
    pub fn from_reply(payload: &[u8]) -> Result<Self> {
        Ok(Self(*exact::<SERIAL_LEN>("GETSERIAL", payload)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SerialNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
