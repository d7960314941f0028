//! Directory validation and source discovery
//!
//! Everything here runs before the pipeline starts; any error is fatal to
//! the run.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{ErrorContext, Result, ResizeError};
use crate::processing::formats::{base_name, is_source_file};

/// Check that `path` is usable as a directory.
///
/// With `must_exist`, a missing path is an error; without it, a missing path
/// is fine (it will be created). An existing non-directory is always an error.
pub async fn validate_directory<P: AsRef<Path>>(path: P, must_exist: bool) -> Result<()> {
    let path = path.as_ref();

    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ResizeError::NotADirectory { path: path.to_path_buf() }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if must_exist {
                Err(ResizeError::DirectoryMissing { path: path.to_path_buf() })
            } else {
                Ok(())
            }
        }
        Err(e) => Err(e).with_file_context(path),
    }
}

/// Validate the destination and create it if missing
pub async fn prepare_destination<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    validate_directory(path, false).await?;
    fs::create_dir_all(path).await.with_file_context(path)?;
    debug!("Destination ready: {:?}", path);
    Ok(())
}

/// List the candidate source images directly inside `dir`.
///
/// Not recursive. Sorted so log output is stable between runs; the pipeline
/// itself makes no ordering promise. Sources whose outputs would land on the
/// same file names as an earlier source are dropped, see
/// [`drop_colliding_stems`].
pub async fn discover_sources<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    let mut entries = fs::read_dir(dir).await.with_file_context(dir)?;
    while let Some(entry) = entries.next_entry().await.with_file_context(dir)? {
        let path = entry.path();
        if !is_source_file(&path) {
            continue;
        }
        // Follows symlinks, like a shell glob would
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => files.push(path),
            Ok(_) => debug!("Skipping non-file entry: {:?}", path),
            Err(e) => debug!("Skipping unreadable entry {:?}: {}", path, e),
        }
    }

    if files.is_empty() {
        return Err(ResizeError::NoSources { dir: dir.to_path_buf() });
    }

    files.sort();
    Ok(drop_colliding_stems(files))
}

/// Keep the first of every group of sources sharing a base name, compared
/// case-insensitively.
///
/// `a.jpg`, `a.jpeg` and `a.JPG` all write `a_<size>.jpg`; letting them run
/// together would overwrite each other's variants concurrently.
pub fn drop_colliding_stems(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(files.len());

    for path in files {
        if seen.insert(base_name(&path).to_lowercase()) {
            kept.push(path);
        } else {
            warn!(
                "skipping {}: its outputs would overwrite those of another source",
                path.display()
            );
        }
    }
    kept
}
