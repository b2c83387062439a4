use crate::fs::FileSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk shape of `current_task.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskPointer {
    #[serde(default)]
    pub current: Option<PathBuf>,
}

/// What the pointer file says, with each unreadable case kept apart so
/// `resume` can report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerState {
    /// No pointer file (or no working directory) yet.
    Missing,
    /// The file exists but does not parse.
    Invalid(String),
    /// The file parses but names no task.
    Empty,
    Active(PathBuf),
}

impl PointerState {
    pub fn active(self) -> Option<PathBuf> {
        match self {
            PointerState::Active(path) => Some(path),
            _ => None,
        }
    }
}

/// The single "current task" pointer of a workspace.
///
/// At most one task is active per workspace; every write replaces the whole
/// file, so a reader sees either the old or the new pointer, or an
/// unreadable file that counts as no task.
pub struct TaskStore<'a> {
    fs: &'a dyn FileSystem,
    working_dir: PathBuf,
    pointer_path: PathBuf,
}

impl<'a> TaskStore<'a> {
    pub fn new(fs: &'a dyn FileSystem, working_dir: &Path, pointer_path: PathBuf) -> Self {
        Self {
            fs,
            working_dir: working_dir.to_path_buf(),
            pointer_path,
        }
    }

    pub fn inspect(&self) -> PointerState {
        let contents = match self.fs.read_optional(&self.pointer_path) {
            Ok(Some(contents)) => contents,
            Ok(None) => return PointerState::Missing,
            Err(err) => return PointerState::Invalid(format!("{err:#}")),
        };
        let pointer: TaskPointer = match serde_json::from_str(&contents) {
            Ok(pointer) => pointer,
            Err(err) => return PointerState::Invalid(err.to_string()),
        };
        match pointer.current {
            Some(path) if !path.as_os_str().is_empty() => {
                PointerState::Active(self.working_dir.join(path))
            }
            _ => PointerState::Empty,
        }
    }

    /// The active task directory, if any. Never fails; the directory itself
    /// is not checked for existence.
    pub fn get(&self) -> Option<PathBuf> {
        self.inspect().active()
    }

    pub fn set(&self, task_dir: &Path) -> Result<()> {
        self.write(&TaskPointer {
            current: Some(task_dir.to_path_buf()),
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.write(&TaskPointer { current: None })
    }

    fn write(&self, pointer: &TaskPointer) -> Result<()> {
        if !self.fs.is_dir(&self.working_dir) {
            self.fs.create_dir_all(&self.working_dir)?;
        }
        let json = serde_json::to_string_pretty(pointer).context("serializing task pointer")?;
        self.fs.write(&self.pointer_path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::memory::MemoryFileSystem;

    const WORKING: &str = "/ws/.agent_working_dir";
    const POINTER: &str = "/ws/.agent_working_dir/current_task.json";

    fn store(fs: &MemoryFileSystem) -> TaskStore<'_> {
        TaskStore::new(fs, Path::new(WORKING), PathBuf::from(POINTER))
    }

    #[test]
    fn missing_file_is_no_task() {
        let fs = MemoryFileSystem::new();
        assert_eq!(store(&fs).inspect(), PointerState::Missing);
        assert_eq!(store(&fs).get(), None);
    }

    #[test]
    fn corrupt_file_is_no_task() {
        let fs = MemoryFileSystem::new().with_file(POINTER, "{\"current\": \"/ws/.agent");
        assert!(matches!(store(&fs).inspect(), PointerState::Invalid(_)));
        assert_eq!(store(&fs).get(), None);
    }

    #[test]
    fn wrong_shape_is_invalid() {
        let fs = MemoryFileSystem::new().with_file(POINTER, "{\"current\": 42}");
        assert!(matches!(store(&fs).inspect(), PointerState::Invalid(_)));
    }

    #[test]
    fn null_empty_or_absent_current_is_empty() {
        for body in ["{\"current\": null}", "{\"current\": \"\"}", "{}"] {
            let fs = MemoryFileSystem::new().with_file(POINTER, body);
            assert_eq!(store(&fs).inspect(), PointerState::Empty, "body: {body}");
        }
    }

    #[test]
    fn set_creates_working_dir_and_writes_pretty_json() {
        let fs = MemoryFileSystem::new();
        let task = Path::new("/ws/.agent_working_dir/task_x_2026-01-15");
        store(&fs).set(task).unwrap();

        assert!(fs.is_dir(Path::new(WORKING)));
        assert_eq!(
            fs.read(POINTER).unwrap(),
            "{\n  \"current\": \"/ws/.agent_working_dir/task_x_2026-01-15\"\n}"
        );
        assert_eq!(store(&fs).get(), Some(task.to_path_buf()));
    }

    #[test]
    fn clear_writes_null() {
        let fs = MemoryFileSystem::new();
        store(&fs).set(Path::new("/ws/.agent_working_dir/task_x_2026-01-15")).unwrap();
        store(&fs).clear().unwrap();
        assert_eq!(fs.read(POINTER).unwrap(), "{\n  \"current\": null\n}");
        assert_eq!(store(&fs).inspect(), PointerState::Empty);
    }

    #[test]
    fn relative_current_resolves_against_working_dir() {
        let fs = MemoryFileSystem::new().with_file(POINTER, "{\"current\": \"task_y_2026-01-15\"}");
        assert_eq!(
            store(&fs).get(),
            Some(PathBuf::from("/ws/.agent_working_dir/task_y_2026-01-15"))
        );
    }

    #[test]
    fn set_replaces_previous_task() {
        let fs = MemoryFileSystem::new();
        store(&fs).set(Path::new("/a")).unwrap();
        store(&fs).set(Path::new("/b")).unwrap();
        assert_eq!(store(&fs).get(), Some(PathBuf::from("/b")));
    }

    #[test]
    fn write_failure_propagates() {
        let fs = MemoryFileSystem::new();
        fs.deny_writes(WORKING);
        assert!(store(&fs).set(Path::new("/a")).is_err());
    }
}
