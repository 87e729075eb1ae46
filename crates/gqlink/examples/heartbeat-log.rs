//! Stream one minute of heartbeat samples and print the total.
//!
//! Run with:
//!   cargo run --example heartbeat-log -- /dev/ttyUSB0

use gqlink::client::{Client, HeartbeatConfig};
use gqlink::transport::{SerialConfig, DEFAULT_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PORT.to_string());
    let mut client = Client::open(&SerialConfig::new(&port))?;

    let mut total = 0u32;
    let mut stream = client.heartbeat(HeartbeatConfig::default().with_max_samples(60))?;
    for sample in stream.by_ref() {
        let count = sample?;
        total += u32::from(count);
        println!("{count}");
    }

    let report = stream.stop();
    eprintln!("{} samples, {total} counts", report.samples);
    report.into_result()?;
    Ok(())
}
