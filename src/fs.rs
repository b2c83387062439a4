//! Filesystem port used by the task store, the task directories and the hooks.
//!
//! Everything that touches disk goes through [`FileSystem`] so the whole
//! lifecycle can run against [`memory::MemoryFileSystem`] in tests.

#[cfg(test)]
pub mod memory;

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

pub trait FileSystem: Send + Sync {
    /// Read a UTF-8 file, returning `None` if it doesn't exist.
    fn read_optional(&self, path: &Path) -> Result<Option<String>>;

    /// Overwrite (or create) a file with `contents`. The parent directory
    /// must already exist.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all of its missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy `from` to `to`, overwriting `to`.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// List the entries directly inside `path`, sorted by name.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
}

/// `std::fs` backed implementation.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)
            .map(|_| ())
            .with_context(|| format!("copying {} to {}", from.display(), to.display()))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let reader =
            fs::read_dir(path).with_context(|| format!("listing {}", path.display()))?;
        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.with_context(|| format!("listing {}", path.display()))?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            let meta = entry.metadata().ok();
            entries.push(DirEntry {
                name,
                is_dir: meta.as_ref().is_some_and(|m| m.is_dir()),
                modified: meta.and_then(|m| m.modified().ok()),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
