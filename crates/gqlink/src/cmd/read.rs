use crate::cmd::{ReadFlashArgs, Session};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_block, print_reading};

pub fn firmware(session: Session<'_>) -> CliResult<i32> {
    let version = session
        .client
        .version()
        .map_err(|err| client_error("firmware query failed", err))?;
    print_reading(session.device, "firmware", &version.text, None, session.format);
    Ok(SUCCESS)
}

pub fn cpm(session: Session<'_>) -> CliResult<i32> {
    let cpm = session
        .client
        .cpm()
        .map_err(|err| client_error("cpm query failed", err))?;
    print_reading(session.device, "cpm", &cpm, Some("CPM"), session.format);
    Ok(SUCCESS)
}

pub fn voltage(session: Session<'_>) -> CliResult<i32> {
    let volts = session
        .client
        .voltage()
        .map_err(|err| client_error("voltage query failed", err))?;
    print_reading(session.device, "voltage", &volts, Some("V"), session.format);
    Ok(SUCCESS)
}

pub fn temperature(session: Session<'_>) -> CliResult<i32> {
    let celsius = session
        .client
        .temperature()
        .map_err(|err| client_error("temperature query failed", err))?;
    print_reading(session.device, "temperature", &celsius, Some("°C"), session.format);
    Ok(SUCCESS)
}

pub fn gyroscope(session: Session<'_>) -> CliResult<i32> {
    let gyro = session
        .client
        .gyroscope()
        .map_err(|err| client_error("gyroscope query failed", err))?;
    print_reading(session.device, "gyroscope", &gyro, None, session.format);
    Ok(SUCCESS)
}

pub fn serial(session: Session<'_>) -> CliResult<i32> {
    let serial = session
        .client
        .serial_number()
        .map_err(|err| client_error("serial query failed", err))?;
    print_reading(session.device, "serial", &serial, None, session.format);
    Ok(SUCCESS)
}

pub fn config(session: Session<'_>) -> CliResult<i32> {
    let block = session
        .client
        .config()
        .map_err(|err| client_error("config dump failed", err))?;
    print_block(session.device, "config", 0, &block, session.format);
    Ok(SUCCESS)
}

pub fn flash(session: Session<'_>, args: ReadFlashArgs) -> CliResult<i32> {
    let data = session
        .client
        .read_flash(args.address, args.length)
        .map_err(|err| client_error("flash read failed", err))?;
    print_block(session.device, "flash", args.address, &data, session.format);
    Ok(SUCCESS)
}
