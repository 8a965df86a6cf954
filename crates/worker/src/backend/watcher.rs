//! Poll-based progress inference from marker files.
//!
//! The grid job cannot report back directly. Its script drops stage logs
//! and a completion sentinel into the workspace, and [`MarkerWatcher`]
//! looks for them on a fixed interval. A stage that starts and ends
//! between two polls is never seen, and completion is noticed up to one
//! interval late.

use std::path::{Path, PathBuf};
use std::time::Duration;

use simfleet_core::naming::{COMPILE_LOG, COMPLETE_SENTINEL, COMPRESS_LOG, SIMULATE_LOG};
use simfleet_core::status::WorkerStatus;

use super::StatusCell;
use crate::error::WorkerError;

/// Stage markers in priority order: the first one present wins.
pub const STAGE_MARKERS: [(&str, WorkerStatus); 3] = [
    (COMPRESS_LOG, WorkerStatus::Compressing),
    (SIMULATE_LOG, WorkerStatus::Simulating),
    (COMPILE_LOG, WorkerStatus::Compiling),
];

/// Result of a single look at the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The completion sentinel exists.
    Complete,
    /// The highest-priority stage marker present.
    Stage(WorkerStatus),
    /// No marker yet.
    Idle,
}

/// Watches one workspace for stage markers and the completion sentinel.
#[derive(Debug, Clone)]
pub struct MarkerWatcher {
    dir: PathBuf,
    interval: Duration,
    markers: &'static [(&'static str, WorkerStatus)],
    sentinel: &'static str,
}

impl MarkerWatcher {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
            markers: &STAGE_MARKERS,
            sentinel: COMPLETE_SENTINEL,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Inspect the workspace once.
    pub async fn probe(&self) -> Result<Probe, WorkerError> {
        if !exists(&self.dir).await? {
            return Err(WorkerError::WorkspaceVanished(self.dir.clone()));
        }
        if exists(&self.dir.join(self.sentinel)).await? {
            return Ok(Probe::Complete);
        }
        for (marker, status) in self.markers {
            if exists(&self.dir.join(marker)).await? {
                return Ok(Probe::Stage(*status));
            }
        }
        Ok(Probe::Idle)
    }

    /// Sleep, probe, publish the inferred stage; repeat until the sentinel
    /// appears. `Idle` ticks leave the current status untouched.
    pub async fn wait_for_completion(&self, status: &StatusCell) -> Result<(), WorkerError> {
        loop {
            tokio::time::sleep(self.interval).await;
            match self.probe().await? {
                Probe::Complete => return Ok(()),
                Probe::Stage(stage) => status.set(stage),
                Probe::Idle => {}
            }
        }
    }
}

async fn exists(path: &Path) -> Result<bool, WorkerError> {
    Ok(tokio::fs::try_exists(path).await?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
