use std::io::Write;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use gqlink_frame::{CommandWriter, FrameError, ReplyReader};
use gqlink_transport::{SerialConfig, SerialStream, Transport};
use tracing::{debug, info};

use crate::command::{ClockField, Command, MAX_FLASH_ADDRESS};
use crate::error::{ClientError, Result};
use crate::heartbeat::{Heartbeat, HeartbeatConfig};
use crate::values::{
    decode_cpm, decode_date_time, decode_temperature, decode_voltage, encode_date_time,
    year_offset, FirmwareVersion, Gyroscope, SerialNumber,
};

/// Highest key index accepted by [`Client::press_key`].
pub const MAX_KEY: u8 = 3;

/// A session with one device.
///
/// Commands run one at a time: each writes its frame and reads exactly the
/// reply its contract describes before returning. Nothing is retried.
pub struct Client<T: Transport = SerialStream> {
    transport: Option<T>,
}

impl Client<SerialStream> {
    /// Open the serial device described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        Ok(Self::new(SerialStream::open(config)?))
    }
}

impl<T: Transport> Client<T> {
    /// Wrap an already open transport.
    pub fn new(transport: T) -> Self {
        debug!(device = %transport.describe(), "client created");
        Self {
            transport: Some(transport),
        }
    }

    /// Send `command` and return its reply payload (trailer stripped).
    ///
    /// Fire-and-forget and ack-only commands return an empty payload.
    pub fn execute(&mut self, command: &Command) -> Result<Bytes> {
        let frame = command.encode()?;
        let transport = self.transport.as_mut().ok_or(ClientError::Closed)?;

        CommandWriter::new(&mut *transport).write_frame(&frame)?;
        let reply = command
            .reply()
            .read_reply(&mut ReplyReader::new(&mut *transport))
            .inspect_err(|err| debug!(mnemonic = frame.mnemonic, error = %err, "exchange failed"))?;
        Ok(reply)
    }

    /// Firmware model and revision.
    pub fn version(&mut self) -> Result<FirmwareVersion> {
        let reply = self.execute(&Command::GetVersion)?;
        Ok(FirmwareVersion::from_reply(&reply))
    }

    /// Current counts per minute.
    pub fn cpm(&mut self) -> Result<u16> {
        decode_cpm(&self.execute(&Command::GetCpm)?)
    }

    /// Battery voltage in volts.
    pub fn voltage(&mut self) -> Result<f32> {
        decode_voltage(&self.execute(&Command::GetVoltage)?)
    }

    /// Internal temperature in °C.
    pub fn temperature(&mut self) -> Result<f32> {
        decode_temperature(&self.execute(&Command::GetTemperature)?)
    }

    pub fn gyroscope(&mut self) -> Result<Gyroscope> {
        Gyroscope::from_reply(&self.execute(&Command::GetGyro)?)
    }

    pub fn serial_number(&mut self) -> Result<SerialNumber> {
        SerialNumber::from_reply(&self.execute(&Command::GetSerial)?)
    }

    /// The raw 256-byte configuration block.
    pub fn config(&mut self) -> Result<Bytes> {
        self.execute(&Command::GetConfig)
    }

    /// The device clock, reported as UTC.
    pub fn date_time(&mut self) -> Result<DateTime<Utc>> {
        decode_date_time(&self.execute(&Command::GetDateTime)?)
    }

    /// Set the whole device clock. The year must lie in 2000..=2255.
    pub fn set_date_time(&mut self, value: NaiveDateTime) -> Result<()> {
        let fields = encode_date_time(&value)?;
        self.execute(&Command::SetDateTime(fields))?;
        info!(%value, "device clock set");
        Ok(())
    }

    /// Set one clock field. `Year` takes the full year (2000..=2255).
    pub fn set_clock_field(&mut self, field: ClockField, value: u16) -> Result<()> {
        let raw = clock_field_byte(field, value)?;
        self.execute(&Command::SetClockField { field, value: raw })?;
        info!(?field, value, "device clock field set");
        Ok(())
    }

    /// Simulate a front-panel key press (0..=3).
    pub fn press_key(&mut self, key: u8) -> Result<()> {
        if key > MAX_KEY {
            return Err(ClientError::InvalidArgument(format!(
                "key {key} outside 0..={MAX_KEY}"
            )));
        }
        self.execute(&Command::Key(key)).map(drop)
    }

    pub fn power_on(&mut self) -> Result<()> {
        self.execute(&Command::PowerOn)?;
        info!("device powered on");
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<()> {
        self.execute(&Command::PowerOff)?;
        info!("device powered off");
        Ok(())
    }

    pub fn reboot(&mut self) -> Result<()> {
        self.execute(&Command::Reboot)?;
        info!("device rebooting");
        Ok(())
    }

    pub fn factory_reset(&mut self) -> Result<()> {
        self.execute(&Command::FactoryReset)?;
        info!("device reset to factory settings");
        Ok(())
    }

    pub fn erase_config(&mut self) -> Result<()> {
        self.execute(&Command::EraseConfig).map(drop)
    }

    /// Write one byte of the configuration block.
    ///
    /// Takes effect after [`config_update`](Self::config_update).
    pub fn write_config(&mut self, address: u8, data: u8) -> Result<()> {
        self.execute(&Command::WriteConfig { address, data }).map(drop)
    }

    /// Make the device reload its configuration block.
    pub fn config_update(&mut self) -> Result<()> {
        self.execute(&Command::ConfigUpdate).map(drop)
    }

    /// Read `length` bytes of history flash starting at `address`.
    pub fn read_flash(&mut self, address: u32, length: u16) -> Result<Bytes> {
        if address > MAX_FLASH_ADDRESS {
            return Err(ClientError::InvalidArgument(format!(
                "flash address 0x{address:X} exceeds 0x{MAX_FLASH_ADDRESS:06X}"
            )));
        }
        if length == 0 {
            return Err(ClientError::InvalidArgument(
                "flash read length must be at least 1".to_string(),
            ));
        }
        self.execute(&Command::ReadFlash { address, length })
    }

    /// Put the device in heartbeat mode and stream per-second counts.
    ///
    /// The transport moves onto a producer thread until the returned stream
    /// is stopped or dropped.
    pub fn heartbeat(&mut self, config: HeartbeatConfig) -> Result<Heartbeat<'_, T>> {
        Heartbeat::start(&mut self.transport, config)
    }

    /// Flush and release the transport. Calling it again does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        transport.flush().map_err(FrameError::Write)?;
        debug!(device = %transport.describe(), "client closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "flush on drop failed");
        }
    }
}

fn clock_field_byte(field: ClockField, value: u16) -> Result<u8> {
    let range = match field {
        ClockField::Year => return year_offset(i32::from(value)),
        ClockField::Month => 1..=12,
        ClockField::Day => 1..=31,
        ClockField::Hour => 0..=23,
        ClockField::Minute | ClockField::Second => 0..=59,
    };
    if !range.contains(&value) {
        return Err(ClientError::InvalidArgument(format!(
            "{field:?} value {value} outside {}..={}",
            range.start(),
            range.end()
        )));
    }
    // Range checked above.
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use chrono::NaiveDate;

    use super::*;
    use crate::error::ErrorClass;
    use crate::heartbeat::Termination;
    use crate::mock::{Idle, MockDevice, Step};

    fn connect(reply: &[u8]) -> (Client<MockDevice>, crate::mock::Tap) {
        let device = MockDevice::replying(reply);
        let tap = device.tap();
        (Client::new(device), tap)
    }

    #[test]
    fn cpm_exchange() {
        let (mut client, tap) = connect(&[0x00, 0x1C]);
        assert_eq!(client.cpm().unwrap(), 28);
        assert_eq!(tap.written(), b"<GETCPM>>");
    }

    #[test]
    fn version_tolerates_short_reply() {
        let device = MockDevice::new(Idle::Quiet).then(Step::Data(b"GMC-320Re 4.2".to_vec()));
        let mut client = Client::new(device);
        let version = client.version().unwrap();
        assert_eq!(version.text, "GMC-320Re 4.2");
        assert_eq!(version.len, 13);
    }

    #[test]
    fn version_padding_is_kept() {
        let device = MockDevice::new(Idle::Quiet).then(Step::Data(b"GMC-500+Re 2.\0".to_vec()));
        let mut client = Client::new(device);
        let version = client.version().unwrap();
        assert_eq!(version.text, "GMC-500+Re 2.\0");
        assert_eq!(version.to_string(), version.text);
        assert_eq!(version.model(), "GMC-500+");
        assert_eq!(version.revision(), Some("2."));
    }

    #[test]
    fn voltage_and_temperature() {
        let (mut client, _) = connect(&[0x2A]);
        assert!((client.voltage().unwrap() - 4.2).abs() < 1e-6);

        let (mut client, tap) = connect(&[5, 50, 1, 0xAA]);
        assert_eq!(client.temperature().unwrap(), -5.5);
        assert_eq!(tap.written(), b"<GETTEMP>>");
    }

    #[test]
    fn temperature_bad_trailer_is_protocol_mismatch() {
        let (mut client, _) = connect(&[25, 30, 0, 0x00]);
        let err = client.temperature().unwrap_err();
        assert_eq!(err.class(), ErrorClass::ProtocolMismatch);
    }

    #[test]
    fn date_time_round_trip_through_device_bytes() {
        let (mut client, _) = connect(&[24, 3, 15, 9, 5, 0, 0xAA]);
        let value = client.date_time().unwrap();
        assert_eq!(value.to_rfc3339(), "2024-03-15T09:05:00+00:00");
    }

    #[test]
    fn set_date_time_frame_and_ack() {
        let (mut client, tap) = connect(&[0xAA]);
        let value = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        client.set_date_time(value).unwrap();
        assert_eq!(tap.written(), b"<SETDATETIME\x18\x03\x0F\x09\x05\x00>>");
    }

    #[test]
    fn set_date_time_rejects_year_before_2000() {
        let (mut client, tap) = connect(&[0xAA]);
        let value = NaiveDate::from_ymd_opt(1999, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = client.set_date_time(value).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Usage);
        assert!(tap.written().is_empty());
    }

    #[test]
    fn set_clock_fields() {
        let (mut client, tap) = connect(&[0xAA, 0xAA]);
        client.set_clock_field(ClockField::Year, 2024).unwrap();
        client.set_clock_field(ClockField::Hour, 23).unwrap();
        assert_eq!(tap.written(), b"<SETDATEYY\x18>><SETTIMEHH\x17>>");

        assert!(matches!(
            client.set_clock_field(ClockField::Month, 13),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.set_clock_field(ClockField::Year, 1980),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn ack_mismatch() {
        let (mut client, _) = connect(&[0x55]);
        let err = client.factory_reset().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::UnexpectedAck { got: 0x55 })
        ));
    }

    #[test]
    fn fire_and_forget_does_not_read() {
        // Any read would hit the scripted failure.
        let device = MockDevice::new(Idle::Eof).then(Step::Fail(ErrorKind::BrokenPipe));
        let tap = device.tap();
        let mut client = Client::new(device);

        client.press_key(2).unwrap();
        client.power_off().unwrap();
        client.power_on().unwrap();
        client.reboot().unwrap();
        assert_eq!(
            tap.written(),
            b"<KEY\x02>><POWEROFF>><POWERON>><REBOOT>>"
        );
    }

    #[test]
    fn key_out_of_range_writes_nothing() {
        let (mut client, tap) = connect(&[]);
        let err = client.press_key(4).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(tap.written().is_empty());
    }

    #[test]
    fn config_write_sequence() {
        let (mut client, tap) = connect(&[0xAA, 0xAA, 0xAA]);
        client.erase_config().unwrap();
        client.write_config(0x08, 0x01).unwrap();
        client.config_update().unwrap();
        assert_eq!(tap.written(), b"<ECFG>><WCFG\x08\x01>><CFGUPDATE>>");
    }

    #[test]
    fn config_dump_is_256_bytes() {
        let block: Vec<u8> = (0..=255u8).collect();
        let (mut client, _) = connect(&block);
        assert_eq!(client.config().unwrap().as_ref(), block.as_slice());
    }

    #[test]
    fn read_flash_uses_requested_length() {
        let (mut client, tap) = connect(&[0x11; 258]);
        let data = client.read_flash(0x000100, 0x0102).unwrap();
        assert_eq!(data.len(), 258);
        assert_eq!(tap.written(), b"<SPIR\x00\x01\x00\x01\x02>>");
    }

    #[test]
    fn read_flash_validation() {
        let (mut client, tap) = connect(&[]);
        assert!(matches!(
            client.read_flash(0x0100_0000, 16),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.read_flash(0, 0),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(tap.written().is_empty());
    }

    #[test]
    fn serial_and_gyro() {
        let (mut client, _) = connect(&[0xF4, 0x88, 0x00, 0x4A, 0x7B, 0x01, 0x9C]);
        assert_eq!(client.serial_number().unwrap().to_string(), "f488004a7b019c");

        let (mut client, _) = connect(&[0, 1, 0, 2, 0, 3, 0xAA]);
        let gyro = client.gyroscope().unwrap();
        assert_eq!((gyro.x, gyro.y, gyro.z), (1, 2, 3));
    }

    #[test]
    fn short_reply_is_transport_read() {
        let (mut client, _) = connect(&[0x01]);
        let err = client.cpm().unwrap_err();
        assert_eq!(err.class(), ErrorClass::TransportRead);
    }

    #[test]
    fn rejected_write_is_transport_write() {
        let device = MockDevice::replying(&[0x00, 0x01]).rejecting(b"<GETCPM>>");
        let mut client = Client::new(device);
        let err = client.cpm().unwrap_err();
        assert_eq!(err.class(), ErrorClass::TransportWrite);
    }

    #[test]
    fn close_is_idempotent() {
        let (mut client, _) = connect(&[0x00, 0x01]);
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());
        assert!(matches!(client.cpm(), Err(ClientError::Closed)));
        assert!(matches!(
            client.heartbeat(HeartbeatConfig::default()).err(),
            Some(ClientError::Closed)
        ));
    }

    #[test]
    fn heartbeat_hands_transport_back() {
        let device = MockDevice::new(Idle::Quiet).then(Step::Data(vec![0x00, 0x04]));
        let tap = device.tap();
        let mut client = Client::new(device);

        {
            let mut stream = client
                .heartbeat(HeartbeatConfig::default().with_max_samples(1))
                .unwrap();
            assert_eq!(stream.next().unwrap().unwrap(), 4);
            assert!(stream.next().is_none());
            let report = stream.stop();
            assert!(matches!(report.termination, Termination::SampleLimit));
        }

        assert!(!client.is_closed());
        client.press_key(0).unwrap();
        assert_eq!(
            tap.written(),
            b"<HEARTBEAT1>><HEARTBEAT0>><KEY\x00>>"
        );
    }
}
