//! The build command every worker runs inside its workspace.
//!
//! A [`RunSpec`] is assembled once from the [`RunConfig`] and shared
//! read-only by all workers. Optional configuration fields are omitted
//! from the command line when absent, never defaulted.

use serde::Serialize;

use crate::config::RunConfig;

/// Build tool invoked for every instance.
pub const BUILD_PROGRAM: &str = "make";

/// Immutable command template: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSpec {
    program: String,
    args: Vec<String>,
}

impl RunSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Assemble `make <target> [ARCH=64] [SEED=..] [UNIT=..] [PLUSARGS=..] [DEFINES=..]`.
    pub fn from_config(config: &RunConfig) -> Self {
        let mut args = vec![config.target.clone()];
        if config.arch64 {
            args.push("ARCH=64".to_string());
        }
        if let Some(seed) = config.seed {
            args.push(format!("SEED={seed}"));
        }
        if let Some(design) = &config.design {
            args.push(format!("UNIT={design}"));
        }
        if let Some(sim_args) = &config.sim_args {
            args.push(format!("PLUSARGS={sim_args}"));
        }
        if let Some(defines) = &config.defines {
            args.push(format!("DEFINES={defines}"));
        }
        Self::new(BUILD_PROGRAM, args)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Render as a single POSIX shell command line, quoting where needed.
    pub fn to_shell_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quote `s` for a POSIX shell. Plain words are passed through unchanged.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
