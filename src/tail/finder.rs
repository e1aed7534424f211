// SPDX-License-Identifier: Apache-2.0

use glob::{Pattern, glob};
use std::path::{Path, PathBuf};

use crate::tail::error::{Error, Result};

/// FileFinder lists the files of one directory whose names match a glob filter.
///
/// Matching is non-recursive: only direct children of the directory are
/// considered, and directories are skipped.
#[derive(Debug, Clone)]
pub struct FileFinder {
    directory: PathBuf,
    filter: Pattern,
}

impl FileFinder {
    /// Create a new FileFinder for `directory` and the file name pattern `filter`
    pub fn new(directory: impl Into<PathBuf>, filter: &str) -> Result<Self> {
        let filter = Pattern::new(filter).map_err(|e| Error::InvalidGlob(e.to_string()))?;
        Ok(Self {
            directory: directory.into(),
            filter,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether `path` is a direct child of the directory with a matching name.
    ///
    /// Only the path is inspected, so this also holds for files that have
    /// already been removed.
    pub fn matches(&self, path: &Path) -> bool {
        if path.parent() != Some(self.directory.as_path()) {
            return false;
        }

        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.filter.matches(name))
    }

    /// Find all matching files currently in the directory, in listing order
    pub fn find_files(&self) -> Result<Vec<PathBuf>> {
        let escaped = Pattern::escape(&self.directory.to_string_lossy());
        let pattern = Path::new(&escaped).join(self.filter.as_str());
        let pattern = pattern.to_string_lossy();

        let matches = glob(&pattern).map_err(|e| Error::InvalidGlob(e.to_string()))?;

        let mut paths = Vec::new();
        for entry in matches {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;

            // Skip directories
            if path.is_dir() {
                continue;
            }

            paths.push(path);
        }

        Ok(paths)
    }
}
