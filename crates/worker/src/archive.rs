//! `tar.bz2` bundle writer for result artifacts.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use bzip2::Compression;

use crate::error::WorkerError;

/// Summary of a written archive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Member names actually stored (missing inputs are skipped).
    pub members: Vec<String>,
}

/// Write `dest` containing the files `members`, resolved against `base`
/// and stored under their bare names.
///
/// Members that do not exist are skipped with a warning.
pub fn write_tar_bz2(dest: &Path, base: &Path, members: &[String]) -> io::Result<ArchiveSummary> {
    let file = File::create(dest)?;
    let mut builder = tar::Builder::new(BzEncoder::new(file, Compression::best()));

    let mut stored = Vec::with_capacity(members.len());
    for name in members {
        let source = base.join(name);
        if !source.is_file() {
            tracing::warn!(member = %name, archive = %dest.display(), "Skipping missing archive member");
            continue;
        }
        builder.append_path_with_name(&source, name)?;
        stored.push(name.clone());
    }

    builder.into_inner()?.finish()?;

    Ok(ArchiveSummary {
        path: dest.to_path_buf(),
        members: stored,
    })
}

/// [`write_tar_bz2`] on the blocking pool.
pub async fn write_tar_bz2_async(
    dest: PathBuf,
    base: PathBuf,
    members: Vec<String>,
) -> Result<ArchiveSummary, WorkerError> {
    let path = dest.clone();
    let result = tokio::task::spawn_blocking(move || write_tar_bz2(&dest, &base, &members))
        .await
        .map_err(|e| io::Error::other(format!("archive task failed: {e}")))
        .and_then(|r| r);

    result.map_err(|source| WorkerError::Archive { path, source })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
