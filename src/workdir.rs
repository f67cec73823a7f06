//! Resolution of a writable working directory with a single fallback.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ImportError;

/// Resolve a writable working directory.
///
/// Attempts to create `preferred` and verify it with a write probe; on any
/// failure the same is attempted once against `fallback`. Both failing is
/// [`ImportError::WorkspaceUnavailable`]. The probed directory is created as
/// a side effect even though it is only used later.
pub fn resolve_writable_dir(preferred: &Path, fallback: &Path) -> Result<PathBuf, ImportError> {
    if is_writable(preferred) {
        return Ok(preferred.to_path_buf());
    }
    warn!(
        "working directory {} is not writable, falling back to {}",
        preferred.display(),
        fallback.display()
    );
    if is_writable(fallback) {
        return Ok(fallback.to_path_buf());
    }
    Err(ImportError::WorkspaceUnavailable {
        preferred: preferred.to_path_buf(),
        fallback: fallback.to_path_buf(),
    })
}

/// Create `dir` if needed and verify it survives writing and removing a
/// uniquely named probe file.
fn is_writable(dir: &Path) -> bool {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("cannot create directory {}: {}", dir.display(), e);
        return false;
    }
    let probe = dir.join(format!(".probe-{}", Uuid::new_v4().simple()));
    match fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(e) => {
            warn!("directory {} is not writable: {}", dir.display(), e);
            false
        }
    }
}
