//! Scripted stand-in for a device, shared by the client and heartbeat tests.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gqlink_transport::Transport;

pub(crate) enum Step {
    Data(Vec<u8>),
    Quiet,
    Fail(ErrorKind),
}

/// What reads return once the script runs out.
#[derive(Clone, Copy)]
pub(crate) enum Idle {
    Eof,
    Quiet,
}

#[derive(Clone, Default)]
pub(crate) struct Tap {
    written: Arc<Mutex<Vec<u8>>>,
    discards: Arc<AtomicUsize>,
}

impl Tap {
    pub(crate) fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, frame: &[u8]) -> usize {
        let written = self.written();
        if written.len() < frame.len() {
            return 0;
        }
        written.windows(frame.len()).filter(|w| *w == frame).count()
    }

    pub(crate) fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockDevice {
    steps: VecDeque<Step>,
    idle: Idle,
    rejected: Option<&'static [u8]>,
    tap: Tap,
}

impl MockDevice {
    pub(crate) fn new(idle: Idle) -> Self {
        Self {
            steps: VecDeque::new(),
            idle,
            rejected: None,
            tap: Tap::default(),
        }
    }

    /// A device that answers with `reply` and then closes.
    pub(crate) fn replying(reply: &[u8]) -> Self {
        Self::new(Idle::Eof).then(Step::Data(reply.to_vec()))
    }

    pub(crate) fn then(mut self, step: Step) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Fail any write of exactly `frame` with `BrokenPipe`.
    pub(crate) fn rejecting(mut self, frame: &'static [u8]) -> Self {
        self.rejected = Some(frame);
        self
    }

    pub(crate) fn tap(&self) -> Tap {
        self.tap.clone()
    }
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.steps.push_front(Step::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Quiet) => Err(io::Error::from(ErrorKind::TimedOut)),
            Some(Step::Fail(kind)) => Err(io::Error::from(kind)),
            None => match self.idle {
                Idle::Eof => Ok(0),
                Idle::Quiet => {
                    std::thread::sleep(Duration::from_millis(1));
                    Err(io::Error::from(ErrorKind::TimedOut))
                }
            },
        }
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.rejected == Some(buf) {
            return Err(io::Error::from(ErrorKind::BrokenPipe));
        }
        self.tap.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockDevice {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.tap.discards.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
