use crate::cmd::{KeyArgs, PowerArgs, PowerState, Session, WriteConfigArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::print_action;

pub fn key(session: Session<'_>, args: KeyArgs) -> CliResult<i32> {
    session
        .client
        .press_key(args.key)
        .map_err(|err| client_error("key press failed", err))?;
    let detail = format!("key {}", args.key);
    print_action(session.device, "key", Some(&detail), session.format);
    Ok(SUCCESS)
}

pub fn power(session: Session<'_>, args: PowerArgs) -> CliResult<i32> {
    let (result, action) = match args.state {
        PowerState::On => (session.client.power_on(), "power-on"),
        PowerState::Off => (session.client.power_off(), "power-off"),
    };
    result.map_err(|err| client_error(&format!("{action} failed"), err))?;
    print_action(session.device, action, None, session.format);
    Ok(SUCCESS)
}

pub fn reboot(session: Session<'_>) -> CliResult<i32> {
    session
        .client
        .reboot()
        .map_err(|err| client_error("reboot failed", err))?;
    print_action(session.device, "reboot", None, session.format);
    Ok(SUCCESS)
}

pub fn factory_reset(session: Session<'_>) -> CliResult<i32> {
    session
        .client
        .factory_reset()
        .map_err(|err| client_error("factory reset failed", err))?;
    print_action(session.device, "factory-reset", None, session.format);
    Ok(SUCCESS)
}

pub fn erase_config(session: Session<'_>) -> CliResult<i32> {
    session
        .client
        .erase_config()
        .map_err(|err| client_error("config erase failed", err))?;
    print_action(session.device, "erase-config", None, session.format);
    Ok(SUCCESS)
}

pub fn write_config(session: Session<'_>, args: WriteConfigArgs) -> CliResult<i32> {
    session
        .client
        .write_config(args.address, args.data)
        .map_err(|err| client_error("config write failed", err))?;
    let detail = format!("0x{:02X} = 0x{:02X}", args.address, args.data);
    print_action(session.device, "write-config", Some(&detail), session.format);
    Ok(SUCCESS)
}

pub fn config_update(session: Session<'_>) -> CliResult<i32> {
    session
        .client
        .config_update()
        .map_err(|err| client_error("config update failed", err))?;
    print_action(session.device, "config-update", None, session.format);
    Ok(SUCCESS)
}
