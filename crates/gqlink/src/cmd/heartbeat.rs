use std::collections::VecDeque;

use gqlink_client::{ClientError, HeartbeatCanceller, HeartbeatConfig};
use tracing::{info, warn};

use crate::cmd::{HeartbeatArgs, Session};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::print_sample;

/// Fixed-size ring of the most recent per-second counts.
#[derive(Debug)]
pub struct SlidingWindow {
    samples: VecDeque<u16>,
    capacity: usize,
    total: u32,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Add a sample, evicting the oldest once full. Returns the new total.
    pub fn push(&mut self, count: u16) -> u32 {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.total -= u32::from(oldest);
            }
        }
        self.samples.push_back(count);
        self.total += u32::from(count);
        self.total
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Counts per minute extrapolated from the samples held.
    pub fn per_minute(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        f64::from(self.total) * 60.0 / self.samples.len() as f64
    }
}

pub fn run(session: Session<'_>, args: HeartbeatArgs) -> CliResult<i32> {
    let config = HeartbeatConfig {
        max_samples: args.count,
        ..HeartbeatConfig::default()
    };

    let mut window = SlidingWindow::new(args.window as usize);
    let mut stream = session
        .client
        .heartbeat(config)
        .map_err(|err| client_error("heartbeat start failed", err))?;
    install_ctrlc_handler(stream.canceller())?;

    let mut failure: Option<ClientError> = None;
    for (second, sample) in stream.by_ref().enumerate() {
        match sample {
            Ok(count) => {
                window.push(count);
                print_sample(
                    second + 1,
                    count,
                    window.total(),
                    window.len(),
                    window.per_minute(),
                    session.format,
                );
            }
            Err(err) if failure.is_none() => failure = Some(err),
            Err(err) => warn!(error = %err, "additional heartbeat error"),
        }
    }

    let report = stream.stop();
    info!(
        samples = report.samples,
        termination = ?report.termination,
        window_full = window.is_full(),
        "heartbeat finished"
    );

    if let Some(err) = failure {
        return Err(client_error("heartbeat failed", err));
    }
    report
        .into_result()
        .map_err(|err| client_error("heartbeat failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(canceller: HeartbeatCanceller) -> CliResult<()> {
    ctrlc::set_handler(move || canceller.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
