//! Ordered set of selected input files
//!
//! Holds the PDFs the user has picked, in the order they were added.
//! Membership is by exact path string, so `a.pdf` and `./a.pdf` are
//! distinct entries.

use std::path::{Path, PathBuf};

/// Insertion-ordered list of distinct file paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    paths: Vec<PathBuf>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path unless it is already present.
    ///
    /// Returns `true` if the path was inserted.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Add several paths, returning how many were new
    pub fn extend<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .map(|p| self.add(p))
            .filter(|added| *added)
            .count()
    }

    /// Remove the first entry matching `path`.
    ///
    /// Removing a path that is not selected leaves the store unchanged and
    /// returns `false`.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self
            .paths
            .iter()
            .position(|p| p.as_os_str() == path.as_os_str())
        {
            Some(index) => {
                self.paths.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p.as_os_str() == path.as_os_str())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Whether a path carries the `.pdf` extension (any case)
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
