//! Run dispatcher.
//!
//! Turns a validated [`RunConfig`] into one tokio task per instance, all
//! bounded by a single [`ConcurrencyGate`]. [`Dispatcher::launch`] returns
//! as soon as every task is spawned; [`Dispatcher::run`] additionally drives
//! the status monitor and the result collector.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use simfleet_core::config::{BackendKind, RunConfig};
use simfleet_core::naming::worker_name;
use simfleet_core::run_spec::RunSpec;
use simfleet_core::settings::EngineSettings;
use simfleet_core::status::WorkerStatus;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::{
    GridBackend, LocalBackend, StatusCell, WorkerBackend, WorkerOutcome, WorkerRecord,
};
use crate::collector::{self, RunReport};
use crate::error::WorkerError;
use crate::gate::ConcurrencyGate;
use crate::handle::WorkerHandle;
use crate::monitor::{self, StatusBus, StatusMonitor, StatusSnapshot};
use crate::workspace;

pub struct Dispatcher {
    config: Arc<RunConfig>,
    settings: EngineSettings,
    run_spec: Arc<RunSpec>,
    gate: ConcurrencyGate,
    bus: Arc<StatusBus>,
}

impl Dispatcher {
    /// Build the shared run command from `config` and size the gate to its DOP.
    pub fn new(config: RunConfig, settings: EngineSettings) -> Self {
        let run_spec = Arc::new(RunSpec::from_config(&config));
        let gate = ConcurrencyGate::new(config.dop as usize);
        Self {
            config: Arc::new(config),
            settings,
            run_spec,
            gate,
            bus: Arc::new(StatusBus::default()),
        }
    }

    /// Replace the command run in every workspace.
    pub fn with_run_spec(mut self, run_spec: RunSpec) -> Self {
        self.run_spec = Arc::new(run_spec);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run_spec(&self) -> &RunSpec {
        &self.run_spec
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Receive the status snapshots published during [`run`](Self::run).
    pub fn subscribe(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.bus.subscribe()
    }

    fn backend(&self) -> Arc<WorkerBackend> {
        Arc::new(match self.config.backend {
            BackendKind::Local => WorkerBackend::Local(LocalBackend::new(Arc::clone(&self.run_spec))),
            BackendKind::Grid => WorkerBackend::Grid(GridBackend::new(
                Arc::clone(&self.run_spec),
                self.settings.scheduler.clone(),
                self.settings.poll_interval,
            )),
        })
    }

    /// Prepare a workspace and start a worker for every instance index.
    ///
    /// Does not wait for any worker. A workspace that cannot be built puts
    /// only that instance in `error`.
    pub async fn launch(&self) -> Vec<WorkerHandle> {
        let backend = self.backend();
        let bzip2 = self.config.worker_compresses();
        let mut handles = Vec::with_capacity(self.config.instances as usize);

        for index in self.config.indices() {
            let (cell, rx) = StatusCell::new(index);

            let work_path =
                match workspace::prepare(&self.config.project_root, &self.config.work_dir, index)
                    .await
                {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::error!(index, error = %e, "Workspace setup failed");
                        cell.set(WorkerStatus::Error);
                        let message = e.to_string();
                        let task =
                            tokio::spawn(async move { WorkerOutcome::failed(index, message) });
                        handles.push(WorkerHandle::new(index, rx, task));
                        continue;
                    }
                };

            let record = WorkerRecord {
                index,
                work_path,
                work_dir: self.config.work_dir.clone(),
                backend: self.config.backend,
                bzip2,
                quiet: self.config.quiet,
            };
            let backend = Arc::clone(&backend);
            let gate = self.gate.clone();

            let task = tokio::spawn(async move {
                let result = backend.execute(&record, &cell, &gate).await;
                if let Err(e) = &result {
                    cell.set(WorkerStatus::Error);
                    tracing::error!(index = record.index, error = %e, "Worker failed");
                }
                WorkerOutcome::from_result(record.index, result)
            });

            tracing::info!(index, worker = %worker_name(index), "Worker started");
            handles.push(WorkerHandle::new(index, rx, task));
        }

        handles
    }

    /// Launch every worker, report status until they all finish, then
    /// collect results and write the run summary.
    pub async fn run(&self) -> Result<RunReport, WorkerError> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        tracing::info!(
            %run_id,
            instances = self.config.instances,
            dop = self.config.dop,
            backend = ?self.config.backend,
            command = %self.run_spec.to_shell_line(),
            "Run started",
        );

        let handles = self.launch().await;
        let watched: Vec<_> = handles.iter().map(WorkerHandle::watch).collect();

        let cancel = CancellationToken::new();
        let monitor = StatusMonitor::new(
            watched.clone(),
            self.settings.report_interval,
            Arc::clone(&self.bus),
        );
        let monitor_task = tokio::spawn(monitor.run(cancel.clone()));

        let outcomes = join_all(handles.into_iter().map(WorkerHandle::join)).await;

        cancel.cancel();
        if let Err(e) = monitor_task.await {
            tracing::warn!(error = %e, "Status monitor task failed");
        }
        self.bus.publish(monitor::capture(&watched));

        let archive = collector::finalize(&self.config).await?;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            config: (*self.config).clone(),
            outcomes,
            archive,
        };
        collector::write_summary(&self.config.work_dir, &report).await?;

        tracing::info!(
            %run_id,
            failed = report.failed_count(),
            total = report.outcomes.len(),
            "Run finished",
        );
        Ok(report)
    }
}
