//! Committer: hash-gated atomic writes.
//!
//! ## Protocol
//!
//! 1. SHA-256 the rendered bytes.
//! 2. SHA-256 the current on-disk bytes (missing file = changed).
//! 3. Equal → `Unchanged`, nothing touched.
//! 4. Write `<dest>.surge-sync.tmp` in the destination directory and fsync it.
//! 5. Rename over the destination (atomic on POSIX).
//! 6. Any failure in 4–5 removes the temp file; the destination keeps its
//!    previous complete content.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use surge_core::digest::sha256_hex;

use crate::error::{commit_err, CommitError};

/// Suffix appended to the destination file name for the staging file.
pub const TMP_SUFFIX: &str = ".surge-sync.tmp";

/// Outcome of committing one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    Updated,
    Unchanged,
    /// Dry run: content differs and would have been written.
    WouldUpdate,
}

pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

/// SHA-256 of the file at `path`, or `None` if it does not exist.
pub fn on_disk_hash(path: &Path) -> Result<Option<String>, CommitError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(sha256_hex(&bytes))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(commit_err(path, err)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Committer {
    dry_run: bool,
}

impl Committer {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Write `bytes` to `path` unless the file already holds exactly them.
    pub fn commit(&self, path: &Path, bytes: &[u8]) -> Result<CommitOutcome, CommitError> {
        let digest = sha256_hex(bytes);
        if on_disk_hash(path)?.as_deref() == Some(digest.as_str()) {
            tracing::debug!(path = %path.display(), "unchanged");
            return Ok(CommitOutcome::Unchanged);
        }

        if self.dry_run {
            tracing::info!(path = %path.display(), "[dry-run] would update");
            return Ok(CommitOutcome::WouldUpdate);
        }

        atomic_replace(path, &tmp_path_for(path), |file| file.write_all(bytes))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "updated");
        Ok(CommitOutcome::Updated)
    }
}

/// Stage through `tmp` and rename over `path`. `fill` writes the content.
fn atomic_replace<F>(path: &Path, tmp: &Path, fill: F) -> Result<(), CommitError>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| commit_err(parent, e))?;
    }

    let staged = File::create(tmp).and_then(|mut file| {
        fill(&mut file)?;
        file.flush()?;
        file.sync_all()
    });
    if let Err(e) = staged {
        let _ = fs::remove_file(tmp);
        return Err(commit_err(tmp, e));
    }

    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(commit_err(path, e));
    }
    Ok(())
}
