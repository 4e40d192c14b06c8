//! Filesystem operations module.
//!
//! This module provides the low-level steps around a transfer:
//! - Creating the destination's parent directories
//! - Creating and preallocating the destination file
//! - Discarding a partial destination after an abort
//! - Carrying the source modification time over to the destination

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::warn;

/// Create `path` exclusively and size it to `length` bytes.
///
/// Preallocating keeps the file contiguous on most filesystems and makes an
/// out-of-space condition fail before any data is copied. The returned handle
/// is positioned at offset zero.
///
/// # Errors
/// Fails with `AlreadyExists` if something appeared at `path` since the
/// pre-flight check, or with whatever the filesystem reports for create or
/// resize.
pub fn create_preallocated(path: &Path, length: u64) -> io::Result<File> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.set_len(length)?;
    Ok(file)
}

/// Remove a partially written destination.
///
/// The file is truncated to zero first so the data is gone even if the
/// unlink fails. Errors are logged and swallowed: the file is being thrown
/// away either way.
pub fn discard_partial(file: File, path: &Path) {
    if let Err(e) = file.set_len(0) {
        warn!(path = %path.display(), error = %e, "failed to truncate aborted destination");
    }
    drop(file);

    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove aborted destination");
        }
    }
}

/// Set the modification time of `path` to `modified`.
pub fn copy_modified_time(path: &Path, modified: SystemTime) -> io::Result<()> {
    filetime::set_file_mtime(path, filetime::FileTime::from_system_time(modified))
}

/// Ensure the parent directory of a path exists, creating it if necessary.
///
/// # Arguments
/// * `path` - Path for which the parent directory should be created
///
/// # Errors
/// Fails if the parent exists but is not a directory, or if creating it fails
pub fn ensure_parent_dir_exists(path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    // Skip if parent is empty path (relative root)
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    match fs::metadata(parent) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Parent path exists but is not a directory: {}", parent.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(parent),
        Err(e) => Err(e),
    }
}
