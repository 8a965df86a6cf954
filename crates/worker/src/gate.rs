//! Concurrency gate shared by every worker regardless of backend.
//!
//! A thin wrapper over [`tokio::sync::Semaphore`] handing out owned
//! permits. A [`GateToken`] releases its slot when dropped, so every exit
//! path of a worker (success, error, panic) gives the slot back.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting token pool bounding how many workers may be active at once.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One unit of gate capacity, held for the active phase of a worker.
#[derive(Debug)]
pub struct GateToken {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Create a gate with `capacity` tokens (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait until a token is free and take it.
    pub async fn acquire(&self) -> GateToken {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");
        GateToken { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
