//! Grid execution: each instance is submitted to the cluster scheduler as
//! a generated script and tracked through the marker files it leaves.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use simfleet_core::grid_script::GridScript;
use simfleet_core::run_spec::RunSpec;
use simfleet_core::settings::SchedulerCommand;
use simfleet_core::status::WorkerStatus;
use tokio::process::Command;

use super::watcher::MarkerWatcher;
use super::{inspect_artifacts, with_token, Backend, Execution, StatusCell, WorkerRecord};
use crate::error::WorkerError;
use crate::gate::ConcurrencyGate;

#[derive(Debug, Clone)]
pub struct GridBackend {
    run_spec: Arc<RunSpec>,
    scheduler: SchedulerCommand,
    poll_interval: Duration,
}

impl GridBackend {
    pub fn new(run_spec: Arc<RunSpec>, scheduler: SchedulerCommand, poll_interval: Duration) -> Self {
        Self {
            run_spec,
            scheduler,
            poll_interval,
        }
    }

    /// Render the submission script into the workspace and mark it executable.
    pub async fn write_script(&self, record: &WorkerRecord) -> Result<PathBuf, WorkerError> {
        let script = GridScript {
            index: record.index,
            workspace: &record.work_path,
            work_dir: &record.work_dir,
            run_spec: &self.run_spec,
            quiet: record.quiet,
            compress: record.bzip2,
        };
        let path = record.work_path.join(script.file_name());
        tokio::fs::write(&path, script.render()).await?;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).await?;
        Ok(path)
    }

    /// Hand the script to the scheduler. Only the submission itself is
    /// judged here; the job's own success shows up in the artifacts.
    async fn submit(&self, record: &WorkerRecord, script: &Path) -> Result<(), WorkerError> {
        let output = Command::new(&self.scheduler.program)
            .args(&self.scheduler.args)
            .arg(script)
            .current_dir(&record.work_path)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| {
                WorkerError::Submission(format!("cannot run {}: {e}", self.scheduler.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::Submission(format!(
                "{} exited with {}: {}",
                self.scheduler.program,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::info!(index = record.index, response = %stdout.trim(), "Job submitted");
        Ok(())
    }
}

impl Backend for GridBackend {
    async fn execute(
        &self,
        record: &WorkerRecord,
        status: &StatusCell,
        gate: &ConcurrencyGate,
    ) -> Result<Execution, WorkerError> {
        let script = self.write_script(record).await?;

        with_token(gate, status, async {
            status.set(WorkerStatus::Submitted);
            self.submit(record, &script).await?;

            MarkerWatcher::new(&record.work_path, self.poll_interval)
                .wait_for_completion(status)
                .await?;

            let (artifacts, missing) = inspect_artifacts(record).await;
            for name in &missing {
                tracing::warn!(index = record.index, artifact = %name, "Expected output not found");
            }

            Ok(Execution {
                exit_code: None,
                artifacts,
                missing,
            })
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use simfleet_core::config::BackendKind;

    use super::*;

    fn record(root: &Path) -> WorkerRecord {
        let work_path = root.join("work_2");
        std::fs::create_dir_all(&work_path).expect("workspace");
        WorkerRecord {
            index: 2,
            work_path,
            work_dir: root.to_path_buf(),
            backend: BackendKind::Grid,
            bzip2: false,
            quiet: false,
        }
    }

    fn backend(scheduler: &str) -> GridBackend {
        GridBackend::new(
            Arc::new(RunSpec::new("make", vec!["vsim".into()])),
            SchedulerCommand::parse(scheduler).expect("scheduler"),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn script_is_written_executable() {
        let root = tempfile::tempdir().expect("tempdir");
        let record = record(root.path());

        let path = backend("qsub").write_script(&record).await.expect("write");

        assert_eq!(path, record.work_path.join("simulate_2.sh"));
        let mode = std::fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        let body = std::fs::read_to_string(&path).expect("read");
        assert!(body.contains("make vsim"));
    }

    #[tokio::test]
    async fn rejected_submission_is_an_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let record = record(root.path());
        let gate = ConcurrencyGate::new(1);
        let (cell, _rx) = StatusCell::new(2);

        let result = backend("false").execute(&record, &cell, &gate).await;

        assert_matches!(result, Err(WorkerError::Submission(msg)) if msg.contains("false exited"));
        assert_eq!(cell.get(), WorkerStatus::Error);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn missing_scheduler_is_a_submission_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let record = record(root.path());
        let gate = ConcurrencyGate::new(1);
        let (cell, _rx) = StatusCell::new(2);

        let result = backend("/nonexistent/qsub").execute(&record, &cell, &gate).await;

        assert_matches!(result, Err(WorkerError::Submission(_)));
    }

    #[tokio::test]
    async fn completes_when_sentinel_appears() {
        let root = tempfile::tempdir().expect("tempdir");
        let record = record(root.path());
        std::fs::write(root.path().join("simulation_2.txt"), "trace").expect("artifact");
        let fake = root.path().join("fake_qsub.sh");
        std::fs::write(&fake, "echo 'Your job 42 has been submitted'\ntouch .complete\n")
            .expect("fake scheduler");
        let gate = ConcurrencyGate::new(1);
        let (cell, _rx) = StatusCell::new(2);

        let exec = backend(&format!("sh {}", fake.display()))
            .execute(&record, &cell, &gate)
            .await
            .expect("execute");

        assert_eq!(cell.get(), WorkerStatus::Done);
        assert_eq!(exec.exit_code, None);
        assert_eq!(exec.artifacts, ["simulation_2.txt"]);
        assert_eq!(exec.missing, ["power_waveform_2.out"]);
    }
}
