//! Worker lifecycle states.
//!
//! ```text
//! allocated -> {submitted | simulating} -> compiling -> simulating -> compressing -> done
//!                          \______________________ any step ______________________/-> error
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current lifecycle state of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Workspace exists; waiting for a concurrency token.
    Allocated,
    /// Handed to the grid scheduler; no stage marker seen yet.
    Submitted,
    Compiling,
    Simulating,
    Compressing,
    Done,
    Error,
}

impl WorkerStatus {
    /// Lowercase name used in status tables and the run summary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::Submitted => "submitted",
            Self::Compiling => "compiling",
            Self::Simulating => "simulating",
            Self::Compressing => "compressing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// `done` or `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Holding a concurrency token: neither waiting nor finished.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Self::Allocated
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WorkerStatus; 7] = [
        WorkerStatus::Allocated,
        WorkerStatus::Submitted,
        WorkerStatus::Compiling,
        WorkerStatus::Simulating,
        WorkerStatus::Compressing,
        WorkerStatus::Done,
        WorkerStatus::Error,
    ];

    #[test]
    fn only_done_and_error_are_terminal() {
        let terminal: Vec<_> = ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, [&WorkerStatus::Done, &WorkerStatus::Error]);
    }

    #[test]
    fn allocated_is_not_active() {
        assert!(!WorkerStatus::Allocated.is_active());
        assert!(WorkerStatus::Submitted.is_active());
        assert!(WorkerStatus::Compressing.is_active());
        assert!(!WorkerStatus::Done.is_active());
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = ALL.iter().map(|s| s.to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }
}
