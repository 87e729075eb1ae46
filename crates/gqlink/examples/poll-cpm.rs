//! Print the counts-per-minute reading every few seconds.
//!
//! Run with:
//!   cargo run --example poll-cpm -- /dev/ttyUSB0

use std::thread;
use std::time::Duration;

use gqlink::client::Client;
use gqlink::transport::{SerialConfig, DEFAULT_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PORT.to_string());
    let mut client = Client::open(&SerialConfig::new(&port))?;

    let version = client.version()?;
    eprintln!("Connected to {} on {port}", version);

    loop {
        let cpm = client.cpm()?;
        let volts = client.voltage()?;
        println!("{cpm} CPM (battery {volts:.1} V)");
        thread::sleep(Duration::from_secs(5));
    }
}
