// crates/iolink-rs/src/dispatcher/queue.rs
//! Job pools and the job queue feeding the worker.
//!
//! A pool is a bounded channel prefilled with slot tokens. Acquiring a job
//! takes a token without blocking, completing the job puts it back. The
//! queue between producers and the worker has room for every token of both
//! pools, so a submitted job never waits for space.

use crate::hal::{IolinkError, PoolKind};
use crate::job::JobKind;
use crate::types::PortNumber;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use log::error;

/// Proof that a job record was claimed from a pool.
///
/// Deliberately not `Clone`: a slot is returned exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct JobSlot {
    pool: PoolKind,
    index: u8,
}

impl JobSlot {
    pub fn pool(&self) -> PoolKind {
        self.pool
    }
}

/// A fixed set of job records shared between producers and the worker.
#[derive(Debug, Clone)]
pub struct JobPool {
    kind: PoolKind,
    capacity: usize,
    free_tx: Sender<JobSlot>,
    free_rx: Receiver<JobSlot>,
}

impl JobPool {
    /// Creates a pool of `capacity` records, at most 256.
    pub fn new(kind: PoolKind, capacity: usize) -> Self {
        let (free_tx, free_rx) = bounded(capacity);
        for index in 0..capacity {
            let Ok(index) = u8::try_from(index) else {
                error!("[JOB] {:?} pool truncated to {} records", kind, index);
                break;
            };
            let sent = free_tx.try_send(JobSlot { pool: kind, index });
            debug_assert!(sent.is_ok(), "pool channel holds every record");
        }
        Self {
            kind,
            capacity: free_rx.len(),
            free_tx,
            free_rx,
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claims a free job record without blocking.
    pub fn acquire(&self) -> Result<JobSlot, IolinkError> {
        match self.free_rx.try_recv() {
            Ok(slot) => Ok(slot),
            Err(TryRecvError::Empty) => {
                error!("[JOB] No free job in the {:?} pool", self.kind);
                Err(IolinkError::PoolExhausted(self.kind))
            }
            Err(TryRecvError::Disconnected) => Err(IolinkError::StateInvalid),
        }
    }

    /// Returns a job record to the pool.
    pub fn release(&self, slot: JobSlot) {
        if slot.pool != self.kind {
            error!(
                "[JOB] Slot {} of the {:?} pool returned to the {:?} pool",
                slot.index, slot.pool, self.kind
            );
            return;
        }
        if self.free_tx.try_send(slot).is_err() {
            error!("[JOB] {:?} pool overflow on release", self.kind);
        }
    }

    /// Number of free job records.
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }
}

/// A unit of work for one port.
#[derive(Debug)]
pub struct Job {
    pub port: PortNumber,
    pub kind: JobKind,
    pub slot: JobSlot,
}

/// What travels through the job queue.
#[derive(Debug)]
pub enum Envelope {
    Job(Job),
    /// Stops the worker once every job queued before it has run.
    Exit,
}

/// Hands a job to the worker without blocking. A rejected job is dropped
/// and its slot goes back to `pool`.
pub fn submit(sender: &Sender<Envelope>, pool: &JobPool, job: Job) -> Result<(), IolinkError> {
    let (error, envelope) = match sender.try_send(Envelope::Job(job)) {
        Ok(()) => return Ok(()),
        Err(TrySendError::Full(envelope)) => (IolinkError::QueueFull, envelope),
        Err(TrySendError::Disconnected(envelope)) => (IolinkError::StateInvalid, envelope),
    };
    if let Envelope::Job(job) = envelope {
        error!(
            "[JOB] Port {}: {} rejected: {}",
            job.port,
            job.kind.name(),
            error
        );
        pool.release(job.slot);
    }
    Err(error)
}
