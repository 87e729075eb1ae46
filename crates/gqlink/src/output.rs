use std::fmt::Display;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

const BYTES_PER_ROW: usize = 16;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput<'a, T: Serialize> {
    device: &'a str,
    reading: &'a str,
    value: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
    timestamp: String,
}

/// Print one decoded measurement.
pub fn print_reading<T>(device: &str, reading: &str, value: &T, unit: Option<&str>, format: OutputFormat)
where
    T: Serialize + Display,
{
    match format {
        OutputFormat::Json => {
            let out = ReadingOutput {
                device,
                reading,
                value,
                unit,
                timestamp: now_rfc3339(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "READING", "VALUE", "UNIT"])
                .add_row(vec![
                    device.to_string(),
                    reading.to_string(),
                    value.to_string(),
                    unit.unwrap_or("").to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match unit {
            Some(unit) => println!("{reading}: {value} {unit}"),
            None => println!("{reading}: {value}"),
        },
        OutputFormat::Raw => println!("{value}"),
    }
}

#[derive(Serialize)]
struct BlockOutput<'a> {
    device: &'a str,
    reading: &'a str,
    address: u32,
    length: usize,
    data: String,
    timestamp: String,
}

/// Print a binary block (configuration dump, flash region).
pub fn print_block(device: &str, reading: &str, address: u32, data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = BlockOutput {
                device,
                reading,
                address,
                length: data.len(),
                data: hex::encode(data),
                timestamp: now_rfc3339(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "HEX", "ASCII"]);
            for (row, chunk) in data.chunks(BYTES_PER_ROW).enumerate() {
                table.add_row(vec![
                    format!("{:06X}", address as usize + row * BYTES_PER_ROW),
                    hex_row(chunk),
                    ascii_row(chunk),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (row, chunk) in data.chunks(BYTES_PER_ROW).enumerate() {
                println!(
                    "{:06X}  {:<47}  {}",
                    address as usize + row * BYTES_PER_ROW,
                    hex_row(chunk),
                    ascii_row(chunk)
                );
            }
        }
        OutputFormat::Raw => print_raw(data),
    }
}

#[derive(Serialize)]
struct ActionOutput<'a> {
    device: &'a str,
    action: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

/// Report a command that returns no value.
pub fn print_action(device: &str, action: &str, detail: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ActionOutput {
            device,
            action,
            status: "ok",
            detail,
        }),
        OutputFormat::Table | OutputFormat::Pretty => match detail {
            Some(detail) => println!("{action}: ok ({detail})"),
            None => println!("{action}: ok"),
        },
        OutputFormat::Raw => println!("ok"),
    }
}

#[derive(Serialize)]
struct SampleOutput {
    second: usize,
    count: u16,
    window_total: u32,
    window_len: usize,
    per_minute: f64,
}

/// Print one heartbeat sample with the rolling window total.
pub fn print_sample(
    second: usize,
    count: u16,
    window_total: u32,
    window_len: usize,
    per_minute: f64,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&SampleOutput {
            second,
            count,
            window_total,
            window_len,
            per_minute,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "[{second:>5}] beats per second {count:>3}  per minute {per_minute:>7.1}  ({window_total} in last {window_len}s)"
        ),
        OutputFormat::Raw => println!("{count}"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn hex_row(chunk: &[u8]) -> String {
    chunk
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ascii_row(chunk: &[u8]) -> String {
    chunk
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_ascii_rows() {
        let chunk = b"GMC\x00\xAA";
        assert_eq!(hex_row(chunk), "47 4D 43 00 AA");
        assert_eq!(ascii_row(chunk), "GMC..");
    }

    #[test]
    fn reading_json_shape() {
        let out = ReadingOutput {
            device: "/dev/ttyUSB0",
            reading: "cpm",
            value: &28u16,
            unit: Some("CPM"),
            timestamp: "2024-03-15T09:05:00Z".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert_eq!(json["reading"], "cpm");
        assert_eq!(json["value"], 28);
        assert_eq!(json["unit"], "CPM");
    }

    #[test]
    fn unit_omitted_when_absent() {
        let out = ReadingOutput {
            device: "/dev/ttyUSB0",
            reading: "firmware",
            value: &"GMC-320Re 4.22",
            unit: None,
            timestamp: String::new(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("unit").is_none());
    }
}
