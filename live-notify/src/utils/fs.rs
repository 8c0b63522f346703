//! Filesystem helpers shared across modules.
//!
//! These helpers provide consistent error context (operation + path) and
//! the temp-file + rename sequence used for crash-safe writes.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// Ensure the parent directory of a file path exists, labelling failures with `op`.
pub fn ensure_parent_dir_with_op(op: &'static str, path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| io_error(op, parent, e))
        }
        _ => Ok(()),
    }
}

/// Replace `path` atomically with the bytes produced by `write`.
///
/// The content goes to a temporary file in the destination directory, is
/// flushed and synced, then renamed over `path`. If `write` fails, or any step
/// before the rename fails, the temporary file is removed and `path` is left
/// untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    ensure_parent_dir_with_op("creating state directory", path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| io_error("creating temp file in", dir, e))?;

    write(tmp.as_file_mut()).map_err(|e| io_error("writing temp file for", path, e))?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| io_error("flushing temp file for", path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| io_error("syncing temp file for", path, e))?;

    tmp.persist(path)
        .map_err(|e| io_error("renaming temp file over", path, e.error))?;

    Ok(())
}
