//! Literal version substitution across target files.
//!
//! Every occurrence of the old version string is replaced, with no pattern
//! matching. Files that do not mention the old version are written back
//! unchanged. The first unreadable or unwritable file aborts the whole
//! rewrite; files already processed are not rolled back.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from rewriting target files.
#[derive(Error, Debug)]
pub enum RewriteError {
    /// A target file could not be read or written.
    #[error("cannot update {path}: {source}")]
    FileAccess {
        /// The path as resolved against the working directory.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for rewrite operations.
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Confirmation that one target file was rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUpdate {
    /// The path as declared (relative to the working directory).
    pub path: Utf8PathBuf,
    /// Number of occurrences replaced.
    pub replacements: usize,
}

/// Rewrite `files` in order, calling `on_update` after each one is written.
///
/// Relative paths are resolved against `working_dir`.
#[instrument(skip(files, on_update), fields(%working_dir, count = files.len()))]
pub fn rewrite_versions(
    working_dir: &Utf8Path,
    files: &[Utf8PathBuf],
    old_version: &str,
    new_version: &str,
    mut on_update: impl FnMut(&FileUpdate),
) -> RewriteResult<Vec<FileUpdate>> {
    let mut updates = Vec::with_capacity(files.len());
    for file in files {
        let update = rewrite_file(working_dir, file, old_version, new_version)?;
        on_update(&update);
        updates.push(update);
    }
    Ok(updates)
}

/// Replace every literal `old_version` in one file with `new_version`.
pub fn rewrite_file(
    working_dir: &Utf8Path,
    file: &Utf8Path,
    old_version: &str,
    new_version: &str,
) -> RewriteResult<FileUpdate> {
    let path = working_dir.join(file);
    let access_error = |source| RewriteError::FileAccess {
        path: path.clone(),
        source,
    };

    let text = std::fs::read_to_string(&path).map_err(access_error)?;
    let (rewritten, replacements) = replace_literal(&text, old_version, new_version);
    std::fs::write(&path, rewritten).map_err(access_error)?;

    debug!(%path, replacements, "rewrote file");
    Ok(FileUpdate {
        path: file.to_path_buf(),
        replacements,
    })
}

/// An empty needle matches nothing.
fn replace_literal(text: &str, old: &str, new: &str) -> (String, usize) {
    if old.is_empty() {
        return (text.to_string(), 0);
    }
    (text.replace(old, new), text.matches(old).count())
}
