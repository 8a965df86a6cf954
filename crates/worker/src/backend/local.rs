//! Local execution: the build runs as a direct child process.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;

use simfleet_core::naming::{instance_archive, ArtifactKind, STDERR_LOG, STDOUT_LOG};
use simfleet_core::run_spec::RunSpec;
use simfleet_core::status::WorkerStatus;
use tokio::process::Command;

use super::{with_token, Backend, Execution, StatusCell, WorkerRecord};
use crate::archive;
use crate::error::WorkerError;
use crate::gate::ConcurrencyGate;

/// Runs the shared [`RunSpec`] inside each workspace on this machine.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    run_spec: Arc<RunSpec>,
}

impl LocalBackend {
    pub fn new(run_spec: Arc<RunSpec>) -> Self {
        Self { run_spec }
    }

    /// Spawn the build in the workspace and wait for it to exit.
    ///
    /// The exit code is reported but not judged: a failing build simply
    /// leaves fewer artifacts behind.
    async fn run_child(&self, record: &WorkerRecord) -> Result<Option<i32>, WorkerError> {
        let mut cmd = Command::new(self.run_spec.program());
        cmd.args(self.run_spec.args())
            .current_dir(&record.work_path)
            .stdin(Stdio::null());

        if record.quiet {
            let stdout = std::fs::File::create(record.work_path.join(STDOUT_LOG))?;
            let stderr = std::fs::File::create(record.work_path.join(STDERR_LOG))?;
            cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
        }

        let status = cmd
            .status()
            .await
            .map_err(|source| WorkerError::Spawn {
                program: self.run_spec.program().to_string(),
                source,
            })?;

        let exit_code = status.code();
        if status.success() {
            tracing::info!(index = record.index, "Simulation completed");
        } else {
            tracing::warn!(
                index = record.index,
                exit_code = exit_code.unwrap_or(-1),
                "Simulation exited unsuccessfully",
            );
        }
        Ok(exit_code)
    }
}

impl Backend for LocalBackend {
    async fn execute(
        &self,
        record: &WorkerRecord,
        status: &StatusCell,
        gate: &ConcurrencyGate,
    ) -> Result<Execution, WorkerError> {
        with_token(gate, status, async {
            status.set(WorkerStatus::Simulating);
            let exit_code = self.run_child(record).await?;

            let (artifacts, missing) = rename_artifacts(record).await?;

            if record.bzip2 && !artifacts.is_empty() {
                status.set(WorkerStatus::Compressing);
                let summary = archive::write_tar_bz2_async(
                    record.work_dir.join(instance_archive(record.index)),
                    record.work_dir.clone(),
                    artifacts.clone(),
                )
                .await?;
                tracing::info!(
                    index = record.index,
                    archive = %summary.path.display(),
                    members = summary.members.len(),
                    "Instance results compressed",
                );
            }

            Ok(Execution {
                exit_code,
                artifacts,
                missing,
            })
        })
        .await
    }
}

/// Move the build outputs out of the workspace under their indexed names.
///
/// An absent output is "nothing to rename": it is logged and returned in
/// the missing list rather than failing the worker.
pub async fn rename_artifacts(
    record: &WorkerRecord,
) -> Result<(Vec<String>, Vec<String>), WorkerError> {
    let mut renamed = Vec::new();
    let mut missing = Vec::new();

    for kind in ArtifactKind::ALL {
        let from = record.work_path.join(kind.produced_name());
        let name = kind.renamed(record.index);
        match tokio::fs::rename(&from, record.work_dir.join(&name)).await {
            Ok(()) => renamed.push(name),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    index = record.index,
                    artifact = %kind.produced_name(),
                    "Expected output not found, nothing to rename",
                );
                missing.push(name);
            }
            Err(e) => return Err(WorkerError::Io(e)),
        }
    }

    Ok((renamed, missing))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
