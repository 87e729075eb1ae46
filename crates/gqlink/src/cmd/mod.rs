use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use gqlink_client::{ClockField, Client};
use gqlink_transport::{SerialConfig, SerialStream, DEFAULT_BAUD_RATE, DEFAULT_PORT};

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod clock;
pub mod control;
pub mod heartbeat;
pub mod read;
pub mod version;

/// Serial line options shared by every device command.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Serial device path.
    #[arg(
        long,
        short = 'p',
        env = "GQLINK_PORT",
        default_value = DEFAULT_PORT,
        global = true
    )]
    pub port: PathBuf,

    /// Baud rate.
    #[arg(long, env = "GQLINK_BAUD", default_value_t = DEFAULT_BAUD_RATE, global = true)]
    pub baud: u32,

    /// Per-read timeout (e.g. 3s, 500ms).
    #[arg(long, env = "GQLINK_TIMEOUT", default_value = "3s", global = true)]
    pub timeout: String,
}

impl DeviceArgs {
    pub fn serial_config(&self) -> CliResult<SerialConfig> {
        Ok(SerialConfig::new(&self.port)
            .with_baud_rate(self.baud)
            .with_timeout(parse_duration(&self.timeout)?))
    }

    pub fn label(&self) -> String {
        self.port.display().to_string()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Device(DeviceCommand),
    /// Show version information.
    Version(VersionArgs),
}

/// Subcommands that talk to the device.
#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    /// Show the firmware model and revision.
    Firmware,
    /// Read counts per minute.
    Cpm,
    /// Read the battery voltage.
    Voltage,
    /// Read the internal temperature.
    Temp,
    /// Read the gyroscope axes.
    Gyro,
    /// Read the device serial number.
    Serial,
    /// Dump the 256-byte configuration block.
    Config,
    /// Show or set the device clock.
    DateTime(DateTimeArgs),
    /// Simulate a front-panel key press.
    Key(KeyArgs),
    /// Power the device on or off.
    Power(PowerArgs),
    /// Restart the device.
    Reboot,
    /// Restore factory settings.
    FactoryReset(ConfirmArgs),
    /// Erase the configuration block.
    EraseConfig(ConfirmArgs),
    /// Write one configuration byte.
    WriteConfig(WriteConfigArgs),
    /// Make the device reload its configuration.
    ConfigUpdate,
    /// Read a region of history flash.
    ReadFlash(ReadFlashArgs),
    /// Stream per-second counts with a rolling per-minute total.
    Heartbeat(HeartbeatArgs),
}

pub fn run(command: Command, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args),
        Command::Device(command) => run_device(command, device, format),
    }
}

fn run_device(command: DeviceCommand, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    match &command {
        DeviceCommand::FactoryReset(args) => args.require("factory-reset")?,
        DeviceCommand::EraseConfig(args) => args.require("erase-config")?,
        _ => {}
    }

    let mut client = connect(device)?;
    let label = device.label();
    let session = Session {
        client: &mut client,
        device: &label,
        format,
    };

    let code = match command {
        DeviceCommand::Firmware => read::firmware(session),
        DeviceCommand::Cpm => read::cpm(session),
        DeviceCommand::Voltage => read::voltage(session),
        DeviceCommand::Temp => read::temperature(session),
        DeviceCommand::Gyro => read::gyroscope(session),
        DeviceCommand::Serial => read::serial(session),
        DeviceCommand::Config => read::config(session),
        DeviceCommand::ReadFlash(args) => read::flash(session, args),
        DeviceCommand::DateTime(args) => clock::run(session, args),
        DeviceCommand::Key(args) => control::key(session, args),
        DeviceCommand::Power(args) => control::power(session, args),
        DeviceCommand::Reboot => control::reboot(session),
        DeviceCommand::FactoryReset(_) => control::factory_reset(session),
        DeviceCommand::EraseConfig(_) => control::erase_config(session),
        DeviceCommand::WriteConfig(args) => control::write_config(session, args),
        DeviceCommand::ConfigUpdate => control::config_update(session),
        DeviceCommand::Heartbeat(args) => heartbeat::run(session, args),
    }?;

    client
        .close()
        .map_err(|err| client_error("close failed", err))?;
    Ok(code)
}

/// An open device plus what every command needs to report on it.
pub struct Session<'a> {
    pub client: &'a mut Client<SerialStream>,
    pub device: &'a str,
    pub format: OutputFormat,
}

fn connect(device: &DeviceArgs) -> CliResult<Client<SerialStream>> {
    let config = device.serial_config()?;
    Client::open(&config).map_err(|err| client_error("open failed", err))
}

#[derive(Args, Debug)]
pub struct DateTimeArgs {
    #[command(subcommand)]
    pub action: Option<DateTimeAction>,
}

#[derive(Subcommand, Debug)]
pub enum DateTimeAction {
    /// Print the device clock (default).
    Show,
    /// Set the whole clock from YYYY-MM-DDTHH:MM:SS, or `now` for local time.
    Set {
        value: String,
    },
    /// Set a single clock field.
    SetField {
        field: ClockFieldArg,
        value: u16,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClockFieldArg {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl From<ClockFieldArg> for ClockField {
    fn from(arg: ClockFieldArg) -> Self {
        match arg {
            ClockFieldArg::Year => ClockField::Year,
            ClockFieldArg::Month => ClockField::Month,
            ClockFieldArg::Day => ClockField::Day,
            ClockFieldArg::Hour => ClockField::Hour,
            ClockFieldArg::Minute => ClockField::Minute,
            ClockFieldArg::Second => ClockField::Second,
        }
    }
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Key index (0-3).
    #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
    pub key: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct PowerArgs {
    pub state: PowerState,
}

#[derive(Args, Debug)]
pub struct ConfirmArgs {
    /// Confirm the destructive operation.
    #[arg(long)]
    pub yes: bool,
}

impl ConfirmArgs {
    pub fn require(&self, action: &str) -> CliResult<()> {
        if self.yes {
            Ok(())
        } else {
            Err(CliError::new(
                USAGE,
                format!("{action} is destructive; pass --yes to confirm"),
            ))
        }
    }
}

#[derive(Args, Debug)]
pub struct WriteConfigArgs {
    /// Configuration address (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_u8)]
    pub address: u8,
    /// Byte to write (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_u8)]
    pub data: u8,
}

#[derive(Args, Debug)]
pub struct ReadFlashArgs {
    /// Start address, at most 0xFFFFFF (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_u32)]
    pub address: u32,
    /// Number of bytes to read (1-65535).
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub length: u16,
}

#[derive(Args, Debug)]
pub struct HeartbeatArgs {
    /// Exit after N samples.
    #[arg(long)]
    pub count: Option<usize>,
    /// Seconds in the rolling window.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub window: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid number {input:?}: {err}"))
}

fn parse_u8(input: &str) -> Result<u8, String> {
    let value = parse_u32(input)?;
    u8::try_from(value).map_err(|_| format!("{value} does not fit in a byte"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn numbers_accept_hex() {
        assert_eq!(parse_u32("0x010000").unwrap(), 0x01_0000);
        assert_eq!(parse_u32("4096").unwrap(), 4096);
        assert_eq!(parse_u8("0xFF").unwrap(), 255);
        assert!(parse_u8("256").is_err());
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn confirm_requires_yes() {
        assert!(ConfirmArgs { yes: true }.require("factory-reset").is_ok());
        let err = ConfirmArgs { yes: false }
            .require("factory-reset")
            .unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn serial_config_from_args() {
        let args = DeviceArgs {
            port: PathBuf::from("/dev/ttyACM0"),
            baud: 57_600,
            timeout: "250ms".to_string(),
        };
        let config = args.serial_config().unwrap();
        assert_eq!(config.baud_rate, 57_600);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(args.label(), "/dev/ttyACM0");
    }
}
