//! Submission script rendering for the grid backend.
//!
//! The script runs remotely and reports progress only through files: the
//! build flow drops `compile.log` / `simulate.log`, the compression step
//! holds `compress.log` while it runs, and `.complete` is touched last.

use std::fmt::Write as _;
use std::path::Path;

use crate::naming::{
    grid_script, instance_archive, worker_name, ArtifactKind, COMPLETE_SENTINEL, COMPRESS_LOG,
    STDERR_LOG, STDOUT_LOG,
};
use crate::run_spec::{shell_quote, RunSpec};

/// Scheduler-side stdout/stderr of the job itself.
pub const GRID_STDOUT: &str = "grid_stdout.txt";
pub const GRID_STDERR: &str = "grid_stderr.txt";

/// Everything needed to render one instance's submission script.
#[derive(Debug, Clone, Copy)]
pub struct GridScript<'a> {
    pub index: u32,
    /// Absolute workspace path (`<work_dir>/work_<index>`).
    pub workspace: &'a Path,
    /// Absolute shared working directory receiving renamed artifacts.
    pub work_dir: &'a Path,
    pub run_spec: &'a RunSpec,
    pub quiet: bool,
    pub compress: bool,
}

impl GridScript<'_> {
    /// File name of the script inside the workspace.
    pub fn file_name(&self) -> String {
        grid_script(self.index)
    }

    /// Render the bash script text.
    pub fn render(&self) -> String {
        let ws = self.workspace.display().to_string();
        let wd = shell_quote(&self.work_dir.display().to_string());
        let mut s = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(s, "#!/bin/bash");
        let _ = writeln!(s, "#$ -N {}", worker_name(self.index));
        let _ = writeln!(s, "#$ -cwd");
        let _ = writeln!(s, "#$ -o {ws}/{GRID_STDOUT}");
        let _ = writeln!(s, "#$ -e {ws}/{GRID_STDERR}");
        let _ = writeln!(s);
        let _ = writeln!(s, "cd {} || exit 1", shell_quote(&ws));
        let _ = writeln!(s);

        let build = self.run_spec.to_shell_line();
        if self.quiet {
            let _ = writeln!(s, "{build} > {STDOUT_LOG} 2> {STDERR_LOG}");
        } else {
            let _ = writeln!(s, "{build}");
        }
        let _ = writeln!(s);

        for kind in ArtifactKind::ALL {
            let produced = kind.produced_name();
            let _ = writeln!(
                s,
                "[ -f {produced} ] && mv {produced} {wd}/{}",
                kind.renamed(self.index)
            );
        }

        if self.compress {
            let archive = instance_archive(self.index);
            let members = ArtifactKind::ALL
                .iter()
                .map(|k| k.renamed(self.index))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(s);
            let _ = writeln!(s, "echo compressing > {COMPRESS_LOG}");
            let _ = writeln!(s, "set --");
            let _ = writeln!(s, "for f in {members}; do");
            let _ = writeln!(s, "    [ -f {wd}/\"$f\" ] && set -- \"$@\" \"$f\"");
            let _ = writeln!(s, "done");
            let _ = writeln!(
                s,
                "[ $# -gt 0 ] && tar -cjf {archive} -C {wd} \"$@\" && mv {archive} {wd}/"
            );
            let _ = writeln!(s, "rm -f {COMPRESS_LOG}");
        }

        let _ = writeln!(s);
        let _ = writeln!(s, "touch {COMPLETE_SENTINEL}");
        s
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
