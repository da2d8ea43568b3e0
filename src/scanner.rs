//! Content file enumeration

use crate::core::error::Result;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// A candidate content file
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScannedFile {
    /// Location of the file
    pub path: PathBuf,
}

impl ScannedFile {
    /// File at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the whole file
    pub fn read(&self) -> Result<Bytes> {
        Ok(Bytes::from(std::fs::read(&self.path)?))
    }
}

/// Enumerates the content files of one entity type directory
pub trait Scanner {
    /// Files below `dir`; order is unspecified
    fn scan(&self, dir: &Path) -> Result<Vec<ScannedFile>>;
}

/// Recursive filesystem scanner matching a file extension
#[derive(Clone, Debug)]
pub struct FsScanner {
    extension: String,
}

impl FsScanner {
    /// Scanner for files ending in `.<extension>`
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    fn walk(&self, dir: &Path, found: &mut Vec<ScannedFile>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                self.walk(&path, found)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str()) {
                found.push(ScannedFile::new(path));
            }
        }
        Ok(())
    }
}

impl Default for FsScanner {
    fn default() -> Self {
        Self::new("json")
    }
}

impl Scanner for FsScanner {
    /// Files sorted by path, so repeated runs see the same order
    fn scan(&self, dir: &Path) -> Result<Vec<ScannedFile>> {
        let mut found = Vec::new();
        self.walk(dir, &mut found)?;
        found.sort();
        Ok(found)
    }
}
