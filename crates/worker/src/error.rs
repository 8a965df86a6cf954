use std::path::PathBuf;

/// Failures that end a single worker (or the final collection step).
///
/// None of these abort sibling workers; the dispatcher records them in the
/// worker's outcome and moves on.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Workspace setup failed for {}: {reason}", path.display())]
    WorkspaceSetup { path: PathBuf, reason: String },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Grid submission failed: {0}")]
    Submission(String),

    #[error("Workspace vanished while polling: {}", .0.display())]
    WorkspaceVanished(PathBuf),

    #[error("Archive {} failed: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub(crate) fn setup(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::WorkspaceSetup {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
