//! Heartbeat streaming.
//!
//! In heartbeat mode the device pushes a 2-byte count every second until it
//! is told to stop. [`Heartbeat`] runs the reads on a producer thread that
//! owns the transport, hands samples over a bounded queue, and sends the
//! heartbeat-off command exactly once however the stream ends: cancellation,
//! a read error, the sample limit, or the consumer going away.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use gqlink_frame::{CommandWriter, FrameError, ReplyReader};
use gqlink_transport::{Transport, TransportError};
use tracing::{debug, error, info, trace, warn};

use crate::command::{HEARTBEAT_OFF, HEARTBEAT_ON, HEARTBEAT_SAMPLE_LEN};
use crate::error::{ClientError, Result};
use crate::values::heartbeat_count;

/// Samples buffered between producer and consumer before the producer waits.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Heartbeat stream settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Capacity of the sample queue. Default: 10.
    pub queue_capacity: usize,
    /// Stop after this many samples. Default: unbounded.
    pub max_samples: Option<usize>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_samples: None,
        }
    }
}

impl HeartbeatConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }
}

/// Why a heartbeat stream ended.
#[derive(Debug, Clone)]
pub enum Termination {
    /// The consumer cancelled or stopped the stream.
    Cancelled,
    /// `max_samples` samples were delivered.
    SampleLimit,
    /// The consumer dropped the stream while the producer was delivering.
    ConsumerGone,
    /// Reading a sample failed.
    Failed(Arc<FrameError>),
}

/// Outcome of a finished heartbeat stream.
#[derive(Debug, Clone)]
pub struct HeartbeatReport {
    /// Samples handed to the queue.
    pub samples: usize,
    /// What ended the stream.
    pub termination: Termination,
    /// Result of sending the heartbeat-off command.
    pub cleanup: std::result::Result<(), Arc<FrameError>>,
}

impl HeartbeatReport {
    /// Collapse the report into the first error it carries.
    ///
    /// A read failure wins over a cleanup failure; the cleanup failure is
    /// still visible in `cleanup`.
    pub fn into_result(self) -> Result<usize> {
        if let Termination::Failed(source) = self.termination {
            return Err(ClientError::StreamTerminated { source });
        }
        self.cleanup.map_err(ClientError::HeartbeatCleanup)?;
        Ok(self.samples)
    }

    fn worker_lost(samples: usize) -> Self {
        let lost = Arc::new(FrameError::Read(io::Error::other("heartbeat worker panicked")));
        Self {
            samples,
            termination: Termination::Failed(Arc::clone(&lost)),
            cleanup: Err(lost),
        }
    }
}

/// What the producer thread hands back: the transport and the outcome, or
/// nothing when it never received the transport.
type Outcome<T> = Option<(T, HeartbeatReport)>;
type ProducerTask<T> = Box<dyn FnOnce() -> Outcome<T> + Send>;
type Worker<T> = JoinHandle<Outcome<T>>;

/// Cancels a heartbeat stream from anywhere, e.g. a Ctrl-C handler.
#[derive(Debug, Clone)]
pub struct HeartbeatCanceller {
    flag: Arc<AtomicBool>,
}

impl HeartbeatCanceller {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// A running heartbeat stream.
///
/// Iterating yields one `Ok(count)` per second. A read failure ends the
/// stream with a final `Err(ClientError::StreamTerminated)`, and a failed
/// heartbeat-off command adds `Err(ClientError::HeartbeatCleanup)`. After
/// that the iterator returns `None` for good.
///
/// The stream borrows the client mutably, so no other command can run while
/// it is alive. The transport is handed back when the stream is stopped or
/// dropped.
///
/// Cancellation is checked between reads. With a transport read timeout the
/// producer notices it within one timeout; without one it waits for the next
/// sample.
pub struct Heartbeat<'a, T: Transport> {
    slot: &'a mut Option<T>,
    rx: Option<Receiver<u16>>,
    cancel: Arc<AtomicBool>,
    worker: Option<Worker<T>>,
    report: Option<HeartbeatReport>,
    received: usize,
    pending: VecDeque<ClientError>,
}

impl<'a, T: Transport> Heartbeat<'a, T> {
    pub(crate) fn start(slot: &'a mut Option<T>, config: HeartbeatConfig) -> Result<Self> {
        Self::start_with(slot, config, |work| {
            std::thread::Builder::new()
                .name("gqlink-heartbeat".to_string())
                .spawn(work)
        })
    }

    /// The producer is spawned before `HEARTBEAT1` is sent and waits for the
    /// transport, so a failed spawn leaves both the device and the slot as
    /// they were.
    fn start_with<S>(slot: &'a mut Option<T>, config: HeartbeatConfig, spawn: S) -> Result<Self>
    where
        S: FnOnce(ProducerTask<T>) -> io::Result<Worker<T>>,
    {
        let mut transport = slot.take().ok_or(ClientError::Closed)?;

        let (tx, rx) = bounded(config.queue_capacity);
        let (handoff_tx, handoff_rx) = bounded::<T>(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let producer_cancel = Arc::clone(&cancel);
        let max_samples = config.max_samples;

        let worker = match spawn(Box::new(move || {
            let transport = handoff_rx.recv().ok()?;
            Some(produce(transport, tx, producer_cancel, max_samples))
        })) {
            Ok(worker) => worker,
            Err(err) => {
                *slot = Some(transport);
                return Err(TransportError::Io(err).into());
            }
        };

        if let Err(err) = CommandWriter::new(&mut transport).send(&HEARTBEAT_ON, &[]) {
            *slot = Some(transport);
            drop(handoff_tx);
            if worker.join().is_err() {
                error!("heartbeat worker panicked before start");
            }
            return Err(err.into());
        }
        info!(
            device = %transport.describe(),
            queue_capacity = config.queue_capacity,
            max_samples = ?config.max_samples,
            "heartbeat started"
        );

        if let Err(SendError(mut transport)) = handoff_tx.send(transport) {
            if let Err(err) = CommandWriter::new(&mut transport).send(&HEARTBEAT_OFF, &[]) {
                warn!(error = %err, "failed to leave heartbeat mode");
            }
            *slot = Some(transport);
            return Err(TransportError::Io(io::Error::other(
                "heartbeat worker exited before start",
            ))
            .into());
        }

        Ok(Self {
            slot,
            rx: Some(rx),
            cancel,
            worker: Some(worker),
            report: None,
            received: 0,
            pending: VecDeque::new(),
        })
    }

    /// Ask the stream to end. Samples already queued are discarded.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// A handle that can cancel this stream from another thread.
    pub fn canceller(&self) -> HeartbeatCanceller {
        HeartbeatCanceller {
            flag: Arc::clone(&self.cancel),
        }
    }

    /// Stop the stream, wait for the heartbeat-off command, and return the
    /// outcome.
    pub fn stop(mut self) -> HeartbeatReport {
        self.finish()
    }

    /// The outcome, once the stream has ended.
    pub fn report(&self) -> Option<&HeartbeatReport> {
        self.report.as_ref()
    }

    /// Samples yielded so far.
    pub fn received(&self) -> usize {
        self.received
    }

    fn finish(&mut self) -> HeartbeatReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        self.cancel.store(true, Ordering::Release);
        // Unblocks a producer waiting on a full queue.
        self.rx = None;

        let report = match self.worker.take().map(JoinHandle::join) {
            Some(Ok(Some((transport, report)))) => {
                *self.slot = Some(transport);
                report
            }
            Some(Ok(None)) | Some(Err(_)) | None => {
                error!("heartbeat worker panicked; transport lost");
                HeartbeatReport::worker_lost(self.received)
            }
        };

        if let Termination::Failed(source) = &report.termination {
            self.pending.push_back(ClientError::StreamTerminated {
                source: Arc::clone(source),
            });
        }
        if let Err(err) = &report.cleanup {
            self.pending
                .push_back(ClientError::HeartbeatCleanup(Arc::clone(err)));
        }

        info!(
            samples = report.samples,
            termination = ?report.termination,
            "heartbeat stopped"
        );
        self.report = Some(report.clone());
        report
    }
}

impl<T: Transport> Iterator for Heartbeat<'_, T> {
    type Item = Result<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.pop_front() {
            return Some(Err(err));
        }
        let rx = self.rx.as_ref()?;

        let received = if self.cancel.load(Ordering::Acquire) {
            None
        } else {
            rx.recv().ok()
        };

        match received {
            Some(sample) => {
                self.received += 1;
                Some(Ok(sample))
            }
            None => {
                self.finish();
                self.pending.pop_front().map(Err)
            }
        }
    }
}

impl<T: Transport> Drop for Heartbeat<'_, T> {
    fn drop(&mut self) {
        self.finish();
    }
}

fn produce<T: Transport>(
    mut transport: T,
    tx: Sender<u16>,
    cancel: Arc<AtomicBool>,
    max_samples: Option<usize>,
) -> (T, HeartbeatReport) {
    let mut samples = 0usize;
    let mut reader = ReplyReader::new(&mut transport);

    let termination = loop {
        if cancel.load(Ordering::Acquire) {
            break Termination::Cancelled;
        }
        if max_samples.is_some_and(|max| samples >= max) {
            break Termination::SampleLimit;
        }

        match reader.poll_exact(HEARTBEAT_SAMPLE_LEN) {
            Ok(None) => continue,
            Ok(Some(bytes)) => {
                let count = heartbeat_count(bytes[0], bytes[1]);
                trace!(count, "heartbeat sample");
                if tx.send(count).is_err() {
                    break if cancel.load(Ordering::Acquire) {
                        Termination::Cancelled
                    } else {
                        Termination::ConsumerGone
                    };
                }
                samples += 1;
            }
            Err(err) => {
                debug!(error = %err, "heartbeat read failed");
                break Termination::Failed(Arc::new(err));
            }
        }
    };
    drop(reader);
    drop(tx);

    let cleanup = CommandWriter::new(&mut transport)
        .send(&HEARTBEAT_OFF, &[])
        .map_err(Arc::new);
    match &cleanup {
        Ok(()) => {
            if let Err(err) = transport.discard_input() {
                debug!(error = %err, "could not discard late heartbeat bytes");
            }
        }
        Err(err) => warn!(error = %err, "failed to leave heartbeat mode"),
    }

    (
        transport,
        HeartbeatReport {
            samples,
            termination,
            cleanup,
        },
    )
}
