//! Per-instance workspace builder.
//!
//! Each instance gets `<work_dir>/work_<index>`, recreated from scratch on
//! every run, holding relative symlinks to the shared project sources
//! ([`PROJECT_LINKS`]). Nothing from the project is copied.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use simfleet_core::naming::{workspace_dir, PROJECT_LINKS};

use crate::error::WorkerError;

/// Build a fresh workspace for `index` and return its absolute path.
///
/// Any existing entry at the workspace path is removed first. A missing
/// project entry fails this instance only.
pub async fn prepare(
    project_root: &Path,
    work_dir: &Path,
    index: u32,
) -> Result<PathBuf, WorkerError> {
    let path = work_dir.join(workspace_dir(index));

    match tokio::fs::symlink_metadata(&path).await {
        Ok(meta) if meta.is_dir() => {
            tracing::info!(path = %path.display(), "Deleting existing work directory");
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| WorkerError::setup(&path, format!("cannot remove: {e}")))?;
        }
        Ok(_) => {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| WorkerError::setup(&path, format!("cannot remove: {e}")))?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(WorkerError::setup(&path, e)),
    }

    tokio::fs::create_dir(&path)
        .await
        .map_err(|e| WorkerError::setup(&path, format!("cannot create: {e}")))?;

    for name in PROJECT_LINKS {
        let target = project_root.join(name);
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(WorkerError::setup(
                &path,
                format!("missing project entry {}", target.display()),
            ));
        }
        let link = path.join(name);
        tokio::fs::symlink(relative_path(&target, &path), &link)
            .await
            .map_err(|e| WorkerError::setup(&path, format!("cannot link {name}: {e}")))?;
    }

    tracing::debug!(index, path = %path.display(), "Workspace prepared");
    Ok(path)
}

/// Express absolute `target` relative to absolute directory `base`.
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component<'_>> = target.components().collect();
    let base: Vec<Component<'_>> = base.components().collect();

    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    rel
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
