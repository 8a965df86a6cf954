//! Handle to a launched worker task.

use simfleet_core::naming::worker_name;
use simfleet_core::status::WorkerStatus;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::WorkerOutcome;
use crate::monitor::Watched;

/// Returned by the dispatcher for every instance. Reading the status never
/// blocks; [`join`](Self::join) waits for the terminal outcome.
#[derive(Debug)]
pub struct WorkerHandle {
    index: u32,
    name: String,
    status: watch::Receiver<WorkerStatus>,
    task: JoinHandle<WorkerOutcome>,
}

impl WorkerHandle {
    pub(crate) fn new(
        index: u32,
        status: watch::Receiver<WorkerStatus>,
        task: JoinHandle<WorkerOutcome>,
    ) -> Self {
        Self {
            index,
            name: worker_name(index),
            status,
            task,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status snapshot.
    pub fn status(&self) -> WorkerStatus {
        *self.status.borrow()
    }

    /// Observer view for the status monitor.
    pub fn watch(&self) -> Watched {
        Watched {
            index: self.index,
            name: self.name.clone(),
            status: self.status.clone(),
        }
    }

    /// Wait for the worker to finish.
    ///
    /// A panicked task is reported as an `error` outcome.
    pub async fn join(self) -> WorkerOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(index = self.index, error = %e, "Worker task failed");
                WorkerOutcome::failed(self.index, format!("worker task failed: {e}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
