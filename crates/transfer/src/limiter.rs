//! Bounded admission gate for concurrent part transfers.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::TransferError;

/// Admits at most `capacity` tasks at once.
///
/// Waiters are admitted in the order they called [`acquire`](Self::acquire)
/// (tokio's semaphore is fair). The limiter is cheap to clone and reusable
/// across uploads.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One admitted slot. Released when dropped.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Creates a limiter. Rejects a zero capacity.
    pub fn new(capacity: usize) -> Result<Self, TransferError> {
        if capacity == 0 {
            return Err(TransferError::InvalidCapacity);
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<Slot, TransferError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| TransferError::LimiterClosed)?;
        Ok(Slot { _permit: permit })
    }

    /// Waits for a slot, then spawns `task` holding it until the task settles.
    pub async fn schedule<F>(&self, task: F) -> Result<JoinHandle<F::Output>, TransferError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let slot = self.acquire().await?;
        Ok(slot.spawn(task))
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Slot {
    /// Spawns `task` on the runtime; the slot is released when it finishes,
    /// fails, or panics.
    pub fn spawn<F>(self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(async move {
            let _slot = self;
            task.await
        })
    }
}
