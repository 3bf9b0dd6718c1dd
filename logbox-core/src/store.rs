use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::config::StorageLayout;
use crate::error::{LogboxError, Result};

const MAX_ID_LEN: usize = 128;

/// Check that a remote log identifier is usable verbatim as a file and
/// directory name.
pub fn validate_log_id(id: &str) -> Result<&str> {
    if id.is_empty() {
        return Err(LogboxError::InvalidInput("Log ID is required".into()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(LogboxError::InvalidInput(format!(
            "Log ID longer than {MAX_ID_LEN} bytes"
        )));
    }
    if id.starts_with('.')
        || !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(LogboxError::InvalidInput(format!("invalid Log ID: {id:?}")));
    }
    Ok(id)
}

/// Filesystem layout for downloaded archives and their extracted trees.
#[derive(Clone, Debug)]
pub struct ArchiveStore {
    archive_dir: PathBuf,
    extract_dir: PathBuf,
    incoming_dir: PathBuf,
}

impl ArchiveStore {
    /// Create the storage directories if needed and pin them to absolute paths.
    pub fn open(layout: &StorageLayout) -> Result<Self> {
        let prepare = |dir: &Path| -> Result<PathBuf> {
            fs::create_dir_all(dir)?;
            Ok(dir.canonicalize()?)
        };
        let archive_dir = prepare(&layout.archive_dir)?;
        let extract_dir = prepare(&layout.extract_dir)?;
        let incoming_dir = prepare(&layout.incoming_dir)?;
        info!(
            archive_dir = %archive_dir.display(),
            extract_dir = %extract_dir.display(),
            "archive store ready"
        );
        Ok(Self {
            archive_dir,
            extract_dir,
            incoming_dir,
        })
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    pub fn archive_path(&self, id: &str) -> PathBuf {
        self.archive_dir.join(format!("{id}.zip"))
    }

    pub fn extract_root(&self, id: &str) -> PathBuf {
        self.extract_dir.join(id)
    }

    pub fn incoming_path(&self, id: &str) -> PathBuf {
        self.incoming_dir.join(format!("{id}.zip"))
    }

    pub fn staging_root(&self, id: &str) -> PathBuf {
        self.incoming_dir.join(format!("{id}.d"))
    }

    /// Where the previous extraction root waits while a new one is swapped in.
    pub fn retired_root(&self, id: &str) -> PathBuf {
        self.incoming_dir.join(format!("{id}.old"))
    }

    /// Remove the stored archive and extraction tree. Missing paths count as
    /// already removed.
    pub fn remove(&self, id: &str) -> Result<()> {
        remove_file_if_exists(&self.archive_path(id))?;
        remove_dir_if_exists(&self.extract_root(id))?;
        info!(log_id = id, "removed stored log files");
        Ok(())
    }

    /// Best-effort cleanup of one identifier's scratch artifacts.
    pub fn discard_incoming(&self, id: &str) {
        if let Err(e) = remove_file_if_exists(&self.incoming_path(id)) {
            warn!(log_id = id, error = %e, "failed to remove partial download");
        }
        if let Err(e) = remove_dir_if_exists(&self.staging_root(id)) {
            warn!(log_id = id, error = %e, "failed to remove staging directory");
        }
    }

    /// Drop incoming entries untouched for at least `older_than`; anything
    /// younger may belong to an acquisition still in flight in another
    /// process. Returns how many entries were removed.
    pub fn sweep_incoming(&self, older_than: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.incoming_dir)? {
            let entry = entry?;
            let path = entry.path();
            let modified = entry.metadata()?.modified()?;
            // mtime in the future: clock skew, treat as fresh
            match now.duration_since(modified) {
                Ok(age) if age >= older_than => {}
                _ => continue,
            }
            if entry.file_type()?.is_dir() {
                remove_dir_if_exists(&path)?;
            } else {
                remove_file_if_exists(&path)?;
            }
            debug!(path = %path.display(), "swept stale incoming entry");
            removed += 1;
        }
        if removed > 0 {
            info!(removed, "cleared stale incoming downloads");
        }
        Ok(removed)
    }
}

pub(crate) fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

pub(crate) fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
