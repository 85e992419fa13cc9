use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::edit::Ticket;
use crate::error::Result;
use crate::intake::{DecodeJob, Decoded};
use crate::raster::{CommitJob, Committed};

#[derive(Debug)]
pub enum JobResult {
    Decoded(Ticket, Result<Decoded>),
    Committed(Ticket, Result<Committed>),
}

impl JobResult {
    pub fn ticket(&self) -> Ticket {
        match self {
            JobResult::Decoded(ticket, _) | JobResult::Committed(ticket, _) => *ticket,
        }
    }
}

/// Runs decode and commit jobs on background threads; the UI drains
/// finished results once per frame.
pub struct Worker {
    tx: Sender<JobResult>,
    rx: Receiver<JobResult>,
    in_flight: usize,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, in_flight: 0 }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn decode(&mut self, job: DecodeJob) {
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let (ticket, result) = job.run();
            let _ = tx.send(JobResult::Decoded(ticket, result));
        });
    }

    pub fn commit(&mut self, job: CommitJob) {
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let (ticket, result) = job.run();
            let _ = tx.send(JobResult::Committed(ticket, result));
        });
    }

    /// Finished results, without blocking.
    pub fn drain(&mut self) -> Vec<JobResult> {
        let mut done = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            done.push(result);
        }
        done
    }
}
