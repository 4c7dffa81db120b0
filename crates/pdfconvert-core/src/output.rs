//! Output paths and atomic writes

use crate::error::ConvertError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Build `dir/<input stem>.<extension>`
pub fn output_path_for(input: &Path, dir: &Path, extension: &str) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "document".into());
    name.push(".");
    name.push(extension);
    dir.join(name)
}

/// Ensures a path has the given extension.
///
/// Returns a new PathBuf with the extension set if it is missing or
/// different (compared case-insensitively).
pub fn ensure_extension(path: &Path, extension: &str) -> PathBuf {
    let mut result = path.to_path_buf();
    if result.extension().map_or(true, |ext| {
        ext.to_str()
            .map_or(true, |s| !s.eq_ignore_ascii_case(extension))
    }) {
        result.set_extension(extension);
    }
    result
}

/// Directory a destination file will be created in
fn parent_dir(destination: &Path) -> &Path {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Create a temporary file next to `destination`.
///
/// Callers fill it and hand it to [`commit`]; dropping it instead removes
/// it, so a failed write never leaves a partial destination file.
fn staging_file(destination: &Path) -> Result<NamedTempFile, ConvertError> {
    Ok(NamedTempFile::new_in(parent_dir(destination))?)
}

/// Move a staged file over `destination`, replacing any existing file
fn commit(staged: NamedTempFile, destination: &Path) -> Result<(), ConvertError> {
    staged.persist(destination)?;
    Ok(())
}

/// Write `bytes` to `destination` through a staging file
pub fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let mut staged = staging_file(destination)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    commit(staged, destination)
}
