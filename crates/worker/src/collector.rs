//! Result collection after every worker has joined.
//!
//! Renamed artifacts already carry their instance index, so collection is
//! only about the optional aggregate archive and the JSON run summary.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use simfleet_core::config::{ArchiveScope, RunConfig};
use simfleet_core::naming::{instance_archive, ArtifactKind, AGGREGATE_ARCHIVE, RUN_SUMMARY};
use simfleet_core::status::WorkerStatus;
use uuid::Uuid;

use crate::archive::{self, ArchiveSummary};
use crate::backend::WorkerOutcome;
use crate::error::WorkerError;

/// Member names of the aggregate archive for `config`.
///
/// Built from the configured index range rather than the outcomes, so an
/// instance that failed early shows up as a skipped member.
pub fn aggregate_members(config: &RunConfig) -> Vec<String> {
    match config.archive_scope {
        ArchiveScope::PerInstance => config.indices().map(instance_archive).collect(),
        ArchiveScope::Aggregate => config
            .indices()
            .flat_map(|i| ArtifactKind::ALL.map(|kind| kind.renamed(i)))
            .collect(),
    }
}

/// Write the aggregate archive when compression was requested.
pub async fn finalize(config: &RunConfig) -> Result<Option<ArchiveSummary>, WorkerError> {
    if !config.compress {
        return Ok(None);
    }

    let dest = config.work_dir.join(AGGREGATE_ARCHIVE);
    let members = aggregate_members(config);
    tracing::info!(
        archive = %dest.display(),
        scope = ?config.archive_scope,
        expected = members.len(),
        "Compressing results"
    );

    let summary =
        archive::write_tar_bz2_async(dest, config.work_dir.clone(), members).await?;
    tracing::info!(members = summary.members.len(), "Aggregate archive written");
    Ok(Some(summary))
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Everything known about a finished run, persisted as `run_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: RunConfig,
    pub outcomes: Vec<WorkerOutcome>,
    pub archive: Option<ArchiveSummary>,
}

impl RunReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == WorkerStatus::Error)
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Write `report` as pretty JSON into `work_dir`.
pub async fn write_summary(work_dir: &Path, report: &RunReport) -> Result<(), WorkerError> {
    let json = serde_json::to_vec_pretty(report).map_err(std::io::Error::other)?;
    let path = work_dir.join(RUN_SUMMARY);
    tokio::fs::write(&path, json).await?;
    tracing::debug!(path = %path.display(), "Run summary written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use simfleet_core::config::RunArgs;

    use super::*;

    fn config(dir: &Path, compress: bool, scope: ArchiveScope) -> RunConfig {
        RunConfig::from_args(RunArgs {
            project: dir.to_path_buf(),
            work: dir.to_path_buf(),
            start_index: 4,
            instances: 2,
            compress,
            archive_scope: scope,
            ..RunArgs::default()
        })
        .expect("config")
    }

    #[test]
    fn per_instance_members_are_bundles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let members = aggregate_members(&config(dir.path(), true, ArchiveScope::PerInstance));
        assert_eq!(members, ["simulation_results_4.tar.bz2", "simulation_results_5.tar.bz2"]);
    }

    #[test]
    fn aggregate_members_are_raw_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let members = aggregate_members(&config(dir.path(), true, ArchiveScope::Aggregate));
        assert_eq!(
            members,
            [
                "simulation_4.txt",
                "power_waveform_4.out",
                "simulation_5.txt",
                "power_waveform_5.out",
            ]
        );
    }

    #[tokio::test]
    async fn no_archive_without_compression() {
        let dir = tempfile::tempdir().expect("tempdir");
        let summary = finalize(&config(dir.path(), false, ArchiveScope::Aggregate))
            .await
            .expect("finalize");
        assert!(summary.is_none());
        assert!(!dir.path().join(AGGREGATE_ARCHIVE).exists());
    }

    #[tokio::test]
    async fn archive_skips_absent_members() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("simulation_4.txt"), "a").expect("write");
        std::fs::write(dir.path().join("power_waveform_5.out"), "b").expect("write");

        let summary = finalize(&config(dir.path(), true, ArchiveScope::Aggregate))
            .await
            .expect("finalize")
            .expect("archive");

        assert_eq!(summary.members, ["simulation_4.txt", "power_waveform_5.out"]);
        assert!(dir.path().join(AGGREGATE_ARCHIVE).is_file());
    }

    #[tokio::test]
    async fn summary_is_written_as_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = RunReport {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            config: config(dir.path(), false, ArchiveScope::PerInstance),
            outcomes: vec![WorkerOutcome::failed(4, "boom".into())],
            archive: None,
        };
        assert_eq!(report.failed_count(), 1);

        write_summary(dir.path(), &report).await.expect("write");

        let raw = std::fs::read_to_string(dir.path().join(RUN_SUMMARY)).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["outcomes"][0]["status"], "error");
        assert_eq!(value["outcomes"][0]["error"], "boom");
        assert_eq!(value["config"]["archive_scope"], "per-instance");
    }
}
