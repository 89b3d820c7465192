//! Bounded worker pool for aggregate execution
//!
//! A fixed number of workers run test cases; a bounded number more may wait
//! for a worker. Submissions that would exceed both are rejected up front
//! instead of queueing without bound.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::config::PoolConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool saturated: {requested} cases requested, {available} slots free")]
    Saturated { requested: usize, available: usize },

    #[error("worker pool closed")]
    Closed,
}

/// Fixed-size pool of execution slots
#[derive(Debug)]
pub struct WorkerPool {
    workers: usize,
    queue_capacity: usize,

    /// Limits how many cases run at once
    semaphore: Arc<Semaphore>,

    /// Cases admitted but not yet finished (running or waiting)
    pending: Arc<AtomicUsize>,
}

/// Admission for a batch of cases; each case takes one [`Ticket`]
#[derive(Debug)]
pub struct Reservation {
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    remaining: usize,
}

/// One admitted case. Holding the worker permit runs the case; dropping the
/// ticket frees its queue slot.
#[derive(Debug)]
pub struct Ticket {
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
}

/// A running case's hold on one worker
#[derive(Debug)]
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
    _ticket: Ticket,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let workers = config.workers.max(1);
        Self {
            workers,
            queue_capacity: config.queue_capacity,
            semaphore: Arc::new(Semaphore::new(workers)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Admit `count` cases, or reject them all if the pool cannot hold them
    #[instrument(skip(self))]
    pub fn try_reserve(&self, count: usize) -> Result<Reservation, PoolError> {
        let capacity = self.capacity();
        let admitted = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                pending
                    .checked_add(count)
                    .filter(|total| *total <= capacity)
            });

        match admitted {
            Ok(previous) => {
                debug!(count, pending = previous + count, "reserved pool slots");
                Ok(Reservation {
                    semaphore: Arc::clone(&self.semaphore),
                    pending: Arc::clone(&self.pending),
                    remaining: count,
                })
            }
            Err(pending) => {
                let available = capacity.saturating_sub(pending);
                warn!(count, available, "worker pool saturated");
                Err(PoolError::Saturated {
                    requested: count,
                    available,
                })
            }
        }
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Total cases the pool admits at once: workers plus queue
    pub fn capacity(&self) -> usize {
        self.workers.saturating_add(self.queue_capacity)
    }

    /// Cases admitted and not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Workers not currently running a case
    pub fn idle_workers(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Reservation {
    /// Take one case's ticket out of the reservation
    pub fn ticket(&mut self) -> Option<Ticket> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Ticket {
            semaphore: Arc::clone(&self.semaphore),
            pending: Arc::clone(&self.pending),
        })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.remaining > 0 {
            self.pending.fetch_sub(self.remaining, Ordering::AcqRel);
        }
    }
}

impl Ticket {
    /// Wait for a free worker
    pub async fn start(self) -> Result<WorkerPermit, PoolError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(WorkerPermit {
            _permit: permit,
            _ticket: self,
        })
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}
