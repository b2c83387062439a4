//! In-memory [`FileSystem`] fake.

use super::{DirEntry, FileSystem};
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeMap<PathBuf, SystemTime>,
    /// Monotonic clock so modification order is deterministic.
    ticks: u64,
    /// Paths whose writes fail, for exercising error paths.
    read_only: Vec<PathBuf>,
}

impl State {
    fn tick(&mut self) -> SystemTime {
        self.ticks += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.ticks)
    }

    fn touch_parent(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            let now = self.tick();
            if let Some(modified) = self.dirs.get_mut(parent) {
                *modified = now;
            }
        }
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        if self.read_only.iter().any(|p| path.starts_with(p)) {
            bail!("permission denied: {}", path.display());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parent directories.
    pub fn with_file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).unwrap();
        }
        self.write(path, contents).unwrap();
        self
    }

    /// Make every write at or below `path` fail.
    pub fn deny_writes(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().read_only.push(path.as_ref().to_path_buf());
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state.lock().unwrap().files.get(path.as_ref()).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().files.get(path).cloned())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_writable(path)?;
        let parent = path.parent().unwrap_or(Path::new(""));
        if !parent.as_os_str().is_empty() && !state.dirs.contains_key(parent) {
            bail!("no such directory: {}", parent.display());
        }
        state.files.insert(path.to_path_buf(), contents.to_string());
        state.touch_parent(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.lock().unwrap().dirs.contains_key(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_writable(path)?;
        for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            if ancestor.as_os_str().is_empty() || state.dirs.contains_key(ancestor) {
                continue;
            }
            let now = state.tick();
            state.dirs.insert(ancestor.to_path_buf(), now);
            state.touch_parent(ancestor);
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let contents = self
            .read_optional(from)?
            .ok_or_else(|| anyhow!("no such file: {}", from.display()))?;
        self.write(to, &contents)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let state = self.state.lock().unwrap();
        if !state.dirs.contains_key(path) {
            bail!("no such directory: {}", path.display());
        }
        let dirs = state.dirs.iter().map(|(p, m)| (p, true, Some(*m)));
        let files = state.files.keys().map(|p| (p, false, None));
        let mut entries: Vec<DirEntry> = dirs
            .chain(files)
            .filter(|(p, _, _)| p.parent() == Some(path))
            .filter_map(|(p, is_dir, modified)| {
                Some(DirEntry {
                    name: p.file_name()?.to_str()?.to_string(),
                    is_dir,
                    modified,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
