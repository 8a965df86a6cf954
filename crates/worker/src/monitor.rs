//! Periodic status reporting.
//!
//! [`StatusMonitor`] reads every worker's status through its watch
//! receiver and publishes a [`StatusSnapshot`] on a [`StatusBus`] each
//! interval while work remains. It never writes worker state.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use simfleet_core::status::WorkerStatus;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub index: u32,
    pub name: String,
    pub status: WorkerStatus,
}

/// Every worker's status at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub workers: Vec<SnapshotEntry>,
}

impl StatusSnapshot {
    /// Workers holding a gate token (past `allocated`, not terminal).
    pub fn active_count(&self) -> usize {
        self.workers.iter().filter(|w| w.status.is_active()).count()
    }

    pub fn unfinished_count(&self) -> usize {
        self.workers.iter().filter(|w| !w.status.is_terminal()).count()
    }

    /// Plain-text table for the terminal.
    pub fn render_table(&self) -> String {
        let width = self
            .workers
            .iter()
            .map(|w| w.name.len())
            .max()
            .unwrap_or(0)
            .max("WORKER".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({} active, {} unfinished)",
            self.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            self.active_count(),
            self.unfinished_count(),
        );
        let _ = writeln!(out, "{:<width$}  STATUS", "WORKER");
        for w in &self.workers {
            let _ = writeln!(out, "{:<width$}  {}", w.name, w.status);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// StatusBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 64;

/// Fan-out channel for snapshots. Publishing with no subscriber is a no-op.
#[derive(Debug)]
pub struct StatusBus {
    sender: broadcast::Sender<StatusSnapshot>,
}

impl StatusBus {
    /// Slow receivers past `capacity` observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        let _ = self.sender.send(snapshot);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.sender.subscribe()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// StatusMonitor
// ---------------------------------------------------------------------------

/// Observed worker: index, name and its status receiver.
#[derive(Debug, Clone)]
pub struct Watched {
    pub index: u32,
    pub name: String,
    pub status: watch::Receiver<WorkerStatus>,
}

/// Read every receiver once.
pub fn capture(workers: &[Watched]) -> StatusSnapshot {
    StatusSnapshot {
        timestamp: Utc::now(),
        workers: workers
            .iter()
            .map(|w| SnapshotEntry {
                index: w.index,
                name: w.name.clone(),
                status: *w.status.borrow(),
            })
            .collect(),
    }
}

pub struct StatusMonitor {
    workers: Vec<Watched>,
    interval: Duration,
    bus: Arc<StatusBus>,
}

impl StatusMonitor {
    pub fn new(workers: Vec<Watched>, interval: Duration, bus: Arc<StatusBus>) -> Self {
        Self {
            workers,
            interval,
            bus,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        capture(&self.workers)
    }

    fn any_unfinished(&self) -> bool {
        self.workers.iter().any(|w| !w.status.borrow().is_terminal())
    }

    /// Sleep, snapshot, publish; until every worker is terminal or `cancel`
    /// fires. Returns the number of snapshots published.
    pub async fn run(self, cancel: CancellationToken) -> usize {
        tracing::debug!(
            workers = self.workers.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Status monitor started"
        );

        let mut published = 0;
        while self.any_unfinished() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {
                    let snapshot = self.snapshot();
                    tracing::debug!(
                        active = snapshot.active_count(),
                        unfinished = snapshot.unfinished_count(),
                        "Status snapshot"
                    );
                    self.bus.publish(snapshot);
                    published += 1;
                }
            }
        }

        tracing::debug!(published, "Status monitor stopped");
        published
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
