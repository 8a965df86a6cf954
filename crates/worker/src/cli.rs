use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use simfleet_core::config::{ArchiveScope, RunArgs, DEFAULT_TARGET};

#[derive(Parser, Debug)]
#[command(
    name = "simfleet",
    about = "Fan out simulation runs across local or grid workers.",
    version
)]
pub struct Cli {
    /// Project root holding Makefile, lib, rtl, scr and tb
    #[arg(short = 'p', long = "proj")]
    pub project: PathBuf,

    /// Working directory for workspaces and results
    #[arg(short = 'w', long = "work", default_value = ".")]
    pub work: PathBuf,

    /// First instance index
    #[arg(short = 's', long, default_value_t = 0, allow_negative_numbers = true)]
    pub start: i64,

    /// Number of instances to run
    #[arg(short = 'i', long = "inst", default_value_t = 1, allow_negative_numbers = true)]
    pub instances: i64,

    /// Maximum concurrently active workers (0 = one per instance)
    #[arg(short = 'j', long, default_value_t = 0, allow_negative_numbers = true)]
    pub dop: i64,

    /// Simulation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Design unit
    #[arg(short = 'd', long)]
    pub design: Option<String>,

    /// Simulator plus-args
    #[arg(long = "sim-args")]
    pub sim_args: Option<String>,

    /// Compiler definitions
    #[arg(long)]
    pub defines: Option<String>,

    /// Make target
    #[arg(short = 't', long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Build for the 64-bit architecture
    #[arg(long)]
    pub arch64: bool,

    /// Compress results into tar.bz2 archives
    #[arg(long)]
    pub compress: bool,

    /// Where compression happens
    #[arg(long, value_enum, default_value_t = ArchiveScopeArg::PerInstance)]
    pub archive_scope: ArchiveScopeArg,

    /// Write build output to stdout.txt / stderr.txt in each workspace
    #[arg(long)]
    pub quiet: bool,

    /// Submit instances to the grid scheduler
    #[arg(long)]
    pub grid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchiveScopeArg {
    PerInstance,
    Aggregate,
}

impl From<ArchiveScopeArg> for ArchiveScope {
    fn from(value: ArchiveScopeArg) -> Self {
        match value {
            ArchiveScopeArg::PerInstance => ArchiveScope::PerInstance,
            ArchiveScopeArg::Aggregate => ArchiveScope::Aggregate,
        }
    }
}

impl Cli {
    pub fn into_run_args(self) -> RunArgs {
        RunArgs {
            project: self.project,
            work: self.work,
            start_index: self.start,
            instances: self.instances,
            dop: self.dop,
            seed: self.seed,
            design: self.design,
            sim_args: self.sim_args,
            defines: self.defines,
            target: self.target,
            arch64: self.arch64,
            compress: self.compress,
            archive_scope: self.archive_scope.into(),
            quiet: self.quiet,
            grid: self.grid,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
