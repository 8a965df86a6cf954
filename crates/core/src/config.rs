//! Run configuration: raw arguments and their validated form.
//!
//! [`RunArgs`] mirrors the command line one-to-one, with signed counts and
//! relative paths. [`RunConfig::from_args`] turns it into a [`RunConfig`]
//! or rejects it with [`CoreError::Validation`] before any worker is
//! started.

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Make target built when none is given.
pub const DEFAULT_TARGET: &str = "vsim";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which execution backend runs each instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Direct child process on this machine.
    Local,
    /// Generated script handed to the cluster scheduler.
    Grid,
}

/// Where result compression happens when it is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveScope {
    /// Each worker bundles its own outputs; the collector bundles the bundles.
    #[default]
    PerInstance,
    /// Workers leave outputs uncompressed; the collector bundles all of them.
    Aggregate,
}

// ---------------------------------------------------------------------------
// Raw arguments
// ---------------------------------------------------------------------------

/// Unvalidated run parameters, as collected from the command line.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub project: PathBuf,
    pub work: PathBuf,
    pub start_index: i64,
    pub instances: i64,
    /// Maximum concurrently active workers; `0` means uncapped.
    pub dop: i64,
    pub seed: Option<u64>,
    pub design: Option<String>,
    pub sim_args: Option<String>,
    pub defines: Option<String>,
    pub target: String,
    pub arch64: bool,
    pub compress: bool,
    pub archive_scope: ArchiveScope,
    pub quiet: bool,
    pub grid: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            project: PathBuf::from("."),
            work: PathBuf::from("."),
            start_index: 0,
            instances: 1,
            dop: 0,
            seed: None,
            design: None,
            sim_args: None,
            defines: None,
            target: DEFAULT_TARGET.to_string(),
            arch64: false,
            compress: false,
            archive_scope: ArchiveScope::default(),
            quiet: false,
            grid: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Validated, normalized run configuration.
///
/// Both directories are absolute. `dop` is always in `1..=instances`.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub project_root: PathBuf,
    pub work_dir: PathBuf,
    pub start_index: u32,
    pub instances: u32,
    pub dop: u32,
    pub seed: Option<u64>,
    pub design: Option<String>,
    pub sim_args: Option<String>,
    pub defines: Option<String>,
    pub target: String,
    pub arch64: bool,
    pub compress: bool,
    pub archive_scope: ArchiveScope,
    pub quiet: bool,
    pub backend: BackendKind,
}

impl RunConfig {
    /// Validate `args`, then create the working directory if it is absent.
    ///
    /// Rejects, in order: a project path that is not a directory, a
    /// negative starting index, fewer than one instance, and a DOP outside
    /// `0..=instances`. A DOP of `0` is normalized to the instance count.
    pub fn from_args(args: RunArgs) -> Result<Self, CoreError> {
        if !args.project.is_dir() {
            return Err(CoreError::Validation(format!(
                "project path is not a directory: {}",
                args.project.display()
            )));
        }
        if args.start_index < 0 {
            return Err(CoreError::Validation(format!(
                "starting index must not be negative (got {})",
                args.start_index
            )));
        }
        if args.instances < 1 {
            return Err(CoreError::Validation(
                "must specify at least one instance to run".to_string(),
            ));
        }
        if args.dop < 0 || args.dop > args.instances {
            return Err(CoreError::Validation(format!(
                "degree of parallelism must be between 0 and {} (got {})",
                args.instances, args.dop
            )));
        }
        if args.target.trim().is_empty() {
            return Err(CoreError::Validation(
                "build target must not be empty".to_string(),
            ));
        }

        let start_index = u32::try_from(args.start_index).map_err(|_| {
            CoreError::Validation(format!("starting index too large: {}", args.start_index))
        })?;
        let instances = u32::try_from(args.instances).map_err(|_| {
            CoreError::Validation(format!("instance count too large: {}", args.instances))
        })?;
        if start_index.checked_add(instances).is_none() {
            return Err(CoreError::Validation(
                "starting index plus instance count overflows".to_string(),
            ));
        }
        // Bounded by `instances` above, so the conversion cannot fail.
        let dop = match args.dop as u32 {
            0 => instances,
            n => n,
        };

        if !args.work.is_dir() {
            std::fs::create_dir_all(&args.work).map_err(|e| CoreError::io(&args.work, e))?;
            tracing::info!(path = %args.work.display(), "Created working directory");
        }

        let project_root =
            std::fs::canonicalize(&args.project).map_err(|e| CoreError::io(&args.project, e))?;
        let work_dir =
            std::fs::canonicalize(&args.work).map_err(|e| CoreError::io(&args.work, e))?;

        Ok(Self {
            project_root,
            work_dir,
            start_index,
            instances,
            dop,
            seed: args.seed,
            design: args.design,
            sim_args: args.sim_args,
            defines: args.defines,
            target: args.target,
            arch64: args.arch64,
            compress: args.compress,
            archive_scope: args.archive_scope,
            quiet: args.quiet,
            backend: if args.grid {
                BackendKind::Grid
            } else {
                BackendKind::Local
            },
        })
    }

    /// Instance indices covered by this run: `start..start + instances`.
    pub fn indices(&self) -> Range<u32> {
        self.start_index..self.start_index + self.instances
    }

    /// Whether each worker bundles its own outputs.
    pub fn worker_compresses(&self) -> bool {
        self.compress && self.archive_scope == ArchiveScope::PerInstance
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn args_in(project: &std::path::Path, work: &std::path::Path) -> RunArgs {
        RunArgs {
            project: project.to_path_buf(),
            work: work.to_path_buf(),
            instances: 4,
            ..RunArgs::default()
        }
    }

    #[test]
    fn valid_args_produce_absolute_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RunConfig::from_args(args_in(dir.path(), dir.path())).expect("valid");
        assert!(config.project_root.is_absolute());
        assert!(config.work_dir.is_absolute());
        assert_eq!(config.instances, 4);
        assert_eq!(config.backend, BackendKind::Local);
    }

    #[test]
    fn project_must_be_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("Makefile");
        std::fs::write(&file, "all:\n").expect("write");
        let result = RunConfig::from_args(args_in(&file, dir.path()));
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("not a directory"));
    }

    #[test]
    fn negative_start_index_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            start_index: -1,
            ..args_in(dir.path(), dir.path())
        };
        assert_matches!(RunConfig::from_args(args), Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_instances_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            instances: 0,
            ..args_in(dir.path(), dir.path())
        };
        assert_matches!(RunConfig::from_args(args), Err(CoreError::Validation(_)));
    }

    #[test]
    fn dop_above_instance_count_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            dop: 5,
            ..args_in(dir.path(), dir.path())
        };
        assert_matches!(RunConfig::from_args(args), Err(CoreError::Validation(_)));
    }

    #[test]
    fn negative_dop_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            dop: -2,
            ..args_in(dir.path(), dir.path())
        };
        assert_matches!(RunConfig::from_args(args), Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_dop_means_uncapped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RunConfig::from_args(args_in(dir.path(), dir.path())).expect("valid");
        assert_eq!(config.dop, config.instances);
    }

    #[test]
    fn explicit_dop_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            dop: 2,
            ..args_in(dir.path(), dir.path())
        };
        assert_eq!(RunConfig::from_args(args).expect("valid").dop, 2);
    }

    #[test]
    fn missing_work_dir_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("runs").join("today");
        let config = RunConfig::from_args(args_in(dir.path(), &work)).expect("valid");
        assert!(work.is_dir());
        assert!(config.work_dir.ends_with("runs/today"));
    }

    #[test]
    fn validation_failure_does_not_create_work_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("never");
        let args = RunArgs {
            instances: 0,
            ..args_in(dir.path(), &work)
        };
        assert!(RunConfig::from_args(args).is_err());
        assert!(!work.exists());
    }

    #[test]
    fn indices_cover_start_plus_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = RunArgs {
            start_index: 10,
            instances: 3,
            ..args_in(dir.path(), dir.path())
        };
        let config = RunConfig::from_args(args).expect("valid");
        assert_eq!(config.indices().collect::<Vec<_>>(), vec![10, 11, 12]);
    }

    #[test]
    fn worker_compression_depends_on_scope() {
        let dir = tempfile::tempdir().expect("tempdir");
        let per_instance = RunConfig::from_args(RunArgs {
            compress: true,
            ..args_in(dir.path(), dir.path())
        })
        .expect("valid");
        assert!(per_instance.worker_compresses());

        let aggregate = RunConfig::from_args(RunArgs {
            compress: true,
            archive_scope: ArchiveScope::Aggregate,
            ..args_in(dir.path(), dir.path())
        })
        .expect("valid");
        assert!(!aggregate.worker_compresses());
    }

    #[test]
    fn grid_flag_selects_grid_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RunConfig::from_args(RunArgs {
            grid: true,
            ..args_in(dir.path(), dir.path())
        })
        .expect("valid");
        assert_eq!(config.backend, BackendKind::Grid);
    }
}
