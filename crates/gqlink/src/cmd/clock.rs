use chrono::{Local, NaiveDateTime};
use gqlink_client::ClockField;

use crate::cmd::{DateTimeAction, DateTimeArgs, Session};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_action, print_reading};

const ACCEPTED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

pub fn run(session: Session<'_>, args: DateTimeArgs) -> CliResult<i32> {
    match args.action.unwrap_or(DateTimeAction::Show) {
        DateTimeAction::Show => {
            let now = session
                .client
                .date_time()
                .map_err(|err| client_error("clock read failed", err))?;
            print_reading(session.device, "date_time", &now, None, session.format);
        }
        DateTimeAction::Set { value } => {
            let value = parse_date_time(&value)?;
            session
                .client
                .set_date_time(value)
                .map_err(|err| client_error("clock set failed", err))?;
            let detail = value.format(ACCEPTED_FORMATS[0]).to_string();
            print_action(session.device, "set-date-time", Some(&detail), session.format);
        }
        DateTimeAction::SetField { field, value } => {
            let field = ClockField::from(field);
            session
                .client
                .set_clock_field(field, value)
                .map_err(|err| client_error("clock field set failed", err))?;
            let detail = format!("{field:?} = {value}").to_lowercase();
            print_action(session.device, "set-clock-field", Some(&detail), session.format);
        }
    }
    Ok(SUCCESS)
}

/// `now` is the host's local wall-clock time; the device has no time zone.
fn parse_date_time(input: &str) -> CliResult<NaiveDateTime> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("now") {
        return Ok(Local::now().naive_local());
    }
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("invalid date-time {input:?}: expected YYYY-MM-DDTHH:MM:SS or now"),
            )
        })
}
