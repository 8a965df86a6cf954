//! Worker execution backends.
//!
//! Both backends implement [`Backend`]: the local backend runs the build
//! as a child process, the grid backend submits a generated script and
//! infers progress from marker files. The dispatcher picks one at
//! construction time through [`WorkerBackend`].

pub mod grid;
pub mod local;
pub mod watcher;

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use simfleet_core::config::BackendKind;
use simfleet_core::naming::{worker_name, ArtifactKind};
use simfleet_core::status::WorkerStatus;
use tokio::sync::watch;

use crate::error::WorkerError;
use crate::gate::ConcurrencyGate;

pub use grid::GridBackend;
pub use local::LocalBackend;

// ---------------------------------------------------------------------------
// Worker record and status cell
// ---------------------------------------------------------------------------

/// Static description of one worker, owned by its task.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub index: u32,
    /// Absolute workspace path (`<work_dir>/work_<index>`).
    pub work_path: PathBuf,
    /// Shared working directory receiving renamed artifacts.
    pub work_dir: PathBuf,
    pub backend: BackendKind,
    /// Bundle this worker's outputs into a per-instance archive.
    pub bzip2: bool,
    /// Redirect build output to files in the workspace.
    pub quiet: bool,
}

impl WorkerRecord {
    pub fn name(&self) -> String {
        worker_name(self.index)
    }
}

/// Write side of a worker's status; readers hold a `watch::Receiver`.
#[derive(Debug)]
pub struct StatusCell {
    index: u32,
    tx: watch::Sender<WorkerStatus>,
}

impl StatusCell {
    /// New cell in `allocated`, plus the receiver handed to observers.
    pub fn new(index: u32) -> (Self, watch::Receiver<WorkerStatus>) {
        let (tx, rx) = watch::channel(WorkerStatus::Allocated);
        (Self { index, tx }, rx)
    }

    pub fn set(&self, status: WorkerStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            tracing::debug!(index = self.index, from = %previous, to = %status, "Worker status changed");
        }
    }

    pub fn get(&self) -> WorkerStatus {
        *self.tx.borrow()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a backend reports after a successful execution.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    /// Child exit code, when the backend observes one.
    pub exit_code: Option<i32>,
    /// Renamed artifacts present in the shared working directory.
    pub artifacts: Vec<String>,
    /// Expected artifacts that were not produced.
    pub missing: Vec<String>,
}

/// Terminal report of one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub index: u32,
    pub name: String,
    pub status: WorkerStatus,
    pub exit_code: Option<i32>,
    pub artifacts: Vec<String>,
    pub missing: Vec<String>,
    pub error: Option<String>,
}

impl WorkerOutcome {
    pub fn from_result(index: u32, result: Result<Execution, WorkerError>) -> Self {
        match result {
            Ok(exec) => Self {
                index,
                name: worker_name(index),
                status: WorkerStatus::Done,
                exit_code: exec.exit_code,
                artifacts: exec.artifacts,
                missing: exec.missing,
                error: None,
            },
            Err(e) => Self::failed(index, e.to_string()),
        }
    }

    pub fn failed(index: u32, error: String) -> Self {
        Self {
            index,
            name: worker_name(index),
            status: WorkerStatus::Error,
            exit_code: None,
            artifacts: Vec::new(),
            missing: Vec::new(),
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Contract shared by the local and grid execution strategies.
///
/// Implementations acquire a gate token before leaving `allocated`, set
/// the terminal status themselves, and only then release the token.
pub trait Backend: Send + Sync {
    fn execute(
        &self,
        record: &WorkerRecord,
        status: &StatusCell,
        gate: &ConcurrencyGate,
    ) -> impl Future<Output = Result<Execution, WorkerError>> + Send;
}

/// Backend chosen for a run.
#[derive(Debug)]
pub enum WorkerBackend {
    Local(LocalBackend),
    Grid(GridBackend),
}

impl WorkerBackend {
    pub async fn execute(
        &self,
        record: &WorkerRecord,
        status: &StatusCell,
        gate: &ConcurrencyGate,
    ) -> Result<Execution, WorkerError> {
        match self {
            Self::Local(backend) => backend.execute(record, status, gate).await,
            Self::Grid(backend) => backend.execute(record, status, gate).await,
        }
    }
}

/// Run `active` while holding a gate token.
///
/// The terminal status is published before the token is dropped, so at no
/// instant do more than `capacity` workers look active.
pub(crate) async fn with_token<F>(
    gate: &ConcurrencyGate,
    status: &StatusCell,
    active: F,
) -> Result<Execution, WorkerError>
where
    F: Future<Output = Result<Execution, WorkerError>>,
{
    let token = gate.acquire().await;
    let result = active.await;
    status.set(match result {
        Ok(_) => WorkerStatus::Done,
        Err(_) => WorkerStatus::Error,
    });
    drop(token);
    result
}

/// Split the expected renamed artifacts of `record` into present and missing.
pub(crate) async fn inspect_artifacts(record: &WorkerRecord) -> (Vec<String>, Vec<String>) {
    let mut present = Vec::new();
    let mut missing = Vec::new();
    for kind in ArtifactKind::ALL {
        let name = kind.renamed(record.index);
        match tokio::fs::metadata(record.work_dir.join(&name)).await {
            Ok(meta) if meta.is_file() => present.push(name),
            Ok(_) => missing.push(name),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(index = record.index, artifact = %name, error = %e, "Cannot stat artifact");
                }
                missing.push(name);
            }
        }
    }
    (present, missing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn status_cell_starts_allocated() {
        let (cell, rx) = StatusCell::new(0);
        assert_eq!(cell.get(), WorkerStatus::Allocated);
        assert_eq!(*rx.borrow(), WorkerStatus::Allocated);
    }

    #[test]
    fn status_cell_updates_receivers() {
        let (cell, rx) = StatusCell::new(0);
        cell.set(WorkerStatus::Simulating);
        assert_eq!(*rx.borrow(), WorkerStatus::Simulating);
    }

    #[test]
    fn status_cell_works_without_receivers() {
        let (cell, rx) = StatusCell::new(0);
        drop(rx);
        cell.set(WorkerStatus::Done);
        assert_eq!(cell.get(), WorkerStatus::Done);
    }

    #[test]
    fn failed_outcome_carries_message() {
        let outcome = WorkerOutcome::from_result(
            3,
            Err(WorkerError::Submission("rejected".into())),
        );
        assert_eq!(outcome.status, WorkerStatus::Error);
        assert_eq!(outcome.name, "sim-3");
        assert_eq!(outcome.error.as_deref(), Some("Grid submission failed: rejected"));
    }

    #[tokio::test]
    async fn with_token_sets_terminal_status_before_release() {
        let gate = ConcurrencyGate::new(1);
        let (cell, rx) = StatusCell::new(0);

        let result = with_token(&gate, &cell, async {
            cell.set(WorkerStatus::Simulating);
            Err(WorkerError::Submission("nope".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(*rx.borrow(), WorkerStatus::Error);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn with_token_waits_for_capacity() {
        let gate = ConcurrencyGate::new(1);
        let (cell, _rx) = StatusCell::new(0);
        let held = gate.acquire().await;

        let pending = with_token(&gate, &cell, async { Ok(Execution::default()) });
        let timed = tokio::time::timeout(Duration::from_millis(50), pending).await;
        assert!(timed.is_err(), "must not run without a token");
        assert_eq!(cell.get(), WorkerStatus::Allocated);
        drop(held);
    }

    #[tokio::test]
    async fn inspect_artifacts_splits_present_and_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("simulation_5.txt"), "x").expect("write");
        let record = WorkerRecord {
            index: 5,
            work_path: dir.path().join("work_5"),
            work_dir: dir.path().to_path_buf(),
            backend: BackendKind::Local,
            bzip2: false,
            quiet: false,
        };
        let (present, missing) = inspect_artifacts(&record).await;
        assert_eq!(present, ["simulation_5.txt"]);
        assert_eq!(missing, ["power_waveform_5.out"]);
    }
}
