mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, DeviceArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gqlink", version, about = "GQ GMC radiation monitor CLI")]
struct Cli {
    #[command(flatten)]
    device: DeviceArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.device, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cmd::{DateTimeAction, DeviceCommand, PowerState};

    #[test]
    fn parses_device_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gqlink",
            "cpm",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "57600",
            "--timeout",
            "500ms",
        ])
        .expect("cpm args should parse");

        assert!(matches!(cli.command, Command::Device(DeviceCommand::Cpm)));
        assert_eq!(cli.device.port, PathBuf::from("/dev/ttyACM0"));
        assert_eq!(cli.device.baud, 57_600);
        assert_eq!(cli.device.timeout, "500ms");
    }

    #[test]
    fn parses_date_time_set_field() {
        let cli = Cli::try_parse_from(["gqlink", "date-time", "set-field", "hour", "23"])
            .expect("set-field args should parse");
        match cli.command {
            Command::Device(DeviceCommand::DateTime(args)) => assert!(matches!(
                args.action,
                Some(DateTimeAction::SetField { value: 23, .. })
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_key_out_of_range() {
        let err = Cli::try_parse_from(["gqlink", "key", "4"]).expect_err("key 4 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_power_and_flash() {
        let cli = Cli::try_parse_from(["gqlink", "power", "off"]).expect("power should parse");
        assert!(matches!(
            cli.command,
            Command::Device(DeviceCommand::Power(ref args)) if args.state == PowerState::Off
        ));

        let cli = Cli::try_parse_from(["gqlink", "read-flash", "0x1000", "256"])
            .expect("read-flash should parse");
        match cli.command {
            Command::Device(DeviceCommand::ReadFlash(args)) => {
                assert_eq!(args.address, 0x1000);
                assert_eq!(args.length, 256);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_length_flash_read() {
        let err = Cli::try_parse_from(["gqlink", "read-flash", "0", "0"])
            .expect_err("zero length should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_heartbeat_options() {
        let cli = Cli::try_parse_from(["gqlink", "heartbeat", "--count", "5", "--window", "30"])
            .expect("heartbeat should parse");
        match cli.command {
            Command::Device(DeviceCommand::Heartbeat(args)) => {
                assert_eq!(args.count, Some(5));
                assert_eq!(args.window, 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn version_is_not_a_device_command() {
        let cli = Cli::try_parse_from(["gqlink", "version", "--extended"])
            .expect("version should parse");
        assert!(matches!(cli.command, Command::Version(ref args) if args.extended));

        let code = cmd::run(cli.command, &cli.device, OutputFormat::Raw).unwrap();
        assert_eq!(code, crate::exit::SUCCESS);
    }
}
