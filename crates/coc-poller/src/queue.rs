//! Single-slot FIFO admission for outbound requests
//!
//! Backed by a one-permit tokio `Semaphore`, which grants permits strictly in
//! the order `acquire` was called. The Nth `wait()` therefore resolves only
//! after N-1 admissions have been released.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Serializes every request from every loop: one in flight at a time.
#[derive(Debug, Clone)]
pub struct FetchQueue {
    slot: Arc<Semaphore>,
}

/// The right to issue the single in-flight request.
///
/// Dropping it admits the next waiter.
#[derive(Debug)]
#[must_use = "dropping an Admission immediately releases the queue"]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    pub fn release(self) {}
}

impl Default for FetchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchQueue {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait for this caller's turn. Fails with `Error::Shutdown` once closed.
    pub async fn wait(&self) -> Result<Admission> {
        let permit = self
            .slot
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Shutdown)?;
        Ok(Admission { _permit: permit })
    }

    /// Fail every pending and future `wait()`.
    pub fn close(&self) {
        self.slot.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}
