//! File naming conventions shared by workers, the grid script and the
//! result collector.
//!
//! Renamed artifacts all land in one shared working directory and are kept
//! apart only by the instance index suffix.

/// Prefix of every per-instance workspace directory (`work_<index>`).
pub const WORKSPACE_PREFIX: &str = "work_";

/// Project entries linked into every workspace.
pub const PROJECT_LINKS: &[&str] = &["Makefile", "lib", "rtl", "scr", "tb"];

/// Captured build output in quiet mode.
pub const STDOUT_LOG: &str = "stdout.txt";
pub const STDERR_LOG: &str = "stderr.txt";

/// Grid stage markers, dropped into the workspace as the job progresses.
pub const COMPILE_LOG: &str = "compile.log";
pub const SIMULATE_LOG: &str = "simulate.log";
pub const COMPRESS_LOG: &str = "compress.log";
/// Grid completion sentinel.
pub const COMPLETE_SENTINEL: &str = ".complete";

/// Aggregate archive written by the result collector.
pub const AGGREGATE_ARCHIVE: &str = "simulation_results.tar.bz2";
/// Machine-readable run report written by the result collector.
pub const RUN_SUMMARY: &str = "run_summary.json";

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// An output file the build tool deposits in a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Simulation,
    PowerWaveform,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Simulation, ArtifactKind::PowerWaveform];

    fn stem(self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::PowerWaveform => "power_waveform",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Simulation => "txt",
            Self::PowerWaveform => "out",
        }
    }

    /// Name as produced by the build tool inside the workspace.
    pub fn produced_name(self) -> String {
        format!("{}.{}", self.stem(), self.extension())
    }

    /// Canonical post-rename name: `<kind>_<index>.<ext>`.
    pub fn renamed(self, index: u32) -> String {
        format!("{}_{index}.{}", self.stem(), self.extension())
    }
}

/// Directory name of the workspace for `index`.
pub fn workspace_dir(index: u32) -> String {
    format!("{WORKSPACE_PREFIX}{index}")
}

/// Per-instance result bundle name.
pub fn instance_archive(index: u32) -> String {
    format!("simulation_results_{index}.tar.bz2")
}

/// Generated grid submission script name.
pub fn grid_script(index: u32) -> String {
    format!("simulate_{index}.sh")
}

/// Display name of the worker for `index`, used in logs and status tables.
pub fn worker_name(index: u32) -> String {
    format!("sim-{index}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
