#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bzip2::read::BzDecoder;
use simfleet_core::config::{RunArgs, RunConfig};
use simfleet_core::run_spec::RunSpec;
use simfleet_core::settings::{EngineSettings, SchedulerCommand};
use tempfile::TempDir;

/// Build that drops both outputs, tagged with the workspace name.
pub const PRODUCING_BUILD: &str = "echo \"trace $(basename \"$(pwd)\")\" > simulation.txt; \
     echo wave > power_waveform.out";

/// Scratch project and working directory.
pub struct Fixture {
    _root: TempDir,
    pub project: PathBuf,
    pub work: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let project = root.path().join("design");
        std::fs::create_dir(&project).expect("project dir");
        std::fs::write(project.join("Makefile"), "vsim:\n\t@true\n").expect("makefile");
        for dir in ["lib", "rtl", "scr", "tb"] {
            std::fs::create_dir(project.join(dir)).expect("project subdir");
        }
        let work = root.path().join("runs");
        Self {
            _root: root,
            project,
            work,
        }
    }

    /// Validated config for `instances` starting at `start`, tweaked by `edit`.
    pub fn config(&self, start: i64, instances: i64, edit: impl FnOnce(&mut RunArgs)) -> RunConfig {
        let mut args = RunArgs {
            project: self.project.clone(),
            work: self.work.clone(),
            start_index: start,
            instances,
            ..RunArgs::default()
        };
        edit(&mut args);
        RunConfig::from_args(args).expect("valid config")
    }

    /// Write an executable helper script next to the project.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.project.parent().expect("root").join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("script");
        path
    }
}

/// `sh -c <script>` as the per-workspace command.
pub fn shell_build(script: &str) -> RunSpec {
    RunSpec::new("sh", vec!["-c".to_string(), script.to_string()])
}

/// Settings with short intervals and the given scheduler command line.
pub fn fast_settings(scheduler: &str) -> EngineSettings {
    EngineSettings {
        scheduler: SchedulerCommand::parse(scheduler).expect("scheduler"),
        poll_interval: Duration::from_millis(20),
        report_interval: Duration::from_millis(25),
    }
}

/// Sorted entry names of a `tar.bz2` archive.
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = File::open(path).expect("open archive");
    let mut archive = tar::Archive::new(BzDecoder::new(file));
    let mut names: Vec<String> = archive
        .entries()
        .expect("entries")
        .map(|e| e.expect("entry").path().expect("path").display().to_string())
        .collect();
    names.sort();
    names
}
