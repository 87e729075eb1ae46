//! Serial protocol client for GQ GMC radiation monitors.
//!
//! gqlink talks to GMC-300E+/320+/500+ style Geiger counters over their USB
//! serial bridge: ASCII-bracketed command frames, fixed-length binary
//! replies, and a once-per-second heartbeat stream.
//!
//! # Crate Structure
//!
//! - [`transport`] - Serial port access behind a small `Transport` trait
//! - [`frame`] - Request frame encoding and reply reading/validation
//! - [`client`] - Command catalogue, typed values, heartbeat streaming, and
//!   the `Client` facade
//!
//! ```no_run
//! use gqlink::client::Client;
//! use gqlink::transport::SerialConfig;
//!
//! let mut client = Client::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//! println!("{} CPM", client.cpm()?);
//! # Ok::<(), gqlink::client::ClientError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use gqlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use gqlink_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use gqlink_client::*;
}
