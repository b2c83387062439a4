use crate::completion::CompletionConvention;
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

const FILENAME: &str = "taskfiles.toml";

/// Name of the working directory created under the workspace root.
pub const WORKING_DIR_NAME: &str = ".agent_working_dir";

const POINTER_FILENAME: &str = "current_task.json";

const DEFAULT_WRITE_TOOLS: &[&str] = &[
    "write_file", "edit_file", "replace", "Write", "Edit", "MultiEdit",
];

const DEFAULT_PLANNING_DIRS: &[&str] = &[WORKING_DIR_NAME, ".sisyphus", ".gemini"];

/// Strip surrounding whitespace and one layer of quotes from an env value.
///
/// Hosts sometimes export `WORKSPACE_PATH="/path"` with the quotes intact.
pub fn clean_env_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed);
    trimmed.to_string()
}

/// `path` joined onto `base` unless it is already absolute.
fn anchor(base: &Path, path: &str) -> PathBuf {
    normalize(&base.join(path))
}

/// Drop `.` components so stored paths compare and display cleanly.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Where the workspace lives and where task state is kept inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Root used to display paths relative to the project.
    pub root: PathBuf,
    /// Directory holding the pointer file and every task directory.
    pub working_dir: PathBuf,
}

impl Workspace {
    /// Resolve the workspace from optional overrides, falling back to `cwd`.
    ///
    /// Relative overrides are taken from `cwd`, so both paths come out
    /// absolute whenever `cwd` is.
    pub fn resolve(root: Option<&str>, working_dir: Option<&str>, cwd: &Path) -> Self {
        let root = root
            .map(clean_env_path)
            .filter(|s| !s.is_empty())
            .map(|s| anchor(cwd, &s))
            .unwrap_or_else(|| normalize(cwd));
        let working_dir = working_dir
            .map(clean_env_path)
            .filter(|s| !s.is_empty())
            .map(|s| anchor(cwd, &s))
            .unwrap_or_else(|| root.join(WORKING_DIR_NAME));
        Self { root, working_dir }
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.working_dir.join(POINTER_FILENAME)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.working_dir.join(FILENAME)
    }

    /// Display `path` relative to the workspace root when it lies inside it.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Which output field carries reminder text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    /// `hookSpecificOutput.additionalContext`
    #[default]
    HookSpecificOutput,
    /// Flat top-level `context`, understood by older hook runners.
    Context,
}

/// User-facing preferences stored in `<working_dir>/taskfiles.toml`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Preferences {
    /// Which plan convention decides that a task is complete.
    #[serde(default)]
    pub completion: CompletionConvention,

    /// Prefix shown in every reminder, rendered as `[tag]`.
    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default = "default_resume_command")]
    pub resume_command: String,

    #[serde(default = "default_start_command")]
    pub start_command: String,

    /// Tool names that modify files, checked by the pre-tool hook.
    #[serde(default = "default_write_tools")]
    pub write_tools: Vec<String>,

    /// Path components that mark planning files; writes there get no
    /// orchestrator reminder.
    #[serde(default = "default_planning_dirs")]
    pub planning_dirs: Vec<String>,

    #[serde(default)]
    pub context_field: ContextField,

    /// Directory holding `task_plan.md`, `findings.md` and `progress.md`
    /// templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,

    #[serde(default = "default_list_limit")]
    pub list_limit: usize,

    /// Reminder template overrides, keyed by reminder name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reminders: BTreeMap<String, String>,
}

fn default_tag() -> String {
    "taskfiles".into()
}

fn default_resume_command() -> String {
    "/planning:resume".into()
}

fn default_start_command() -> String {
    "/planning:start".into()
}

fn default_write_tools() -> Vec<String> {
    DEFAULT_WRITE_TOOLS.iter().map(|s| s.to_string()).collect()
}

fn default_planning_dirs() -> Vec<String> {
    DEFAULT_PLANNING_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_list_limit() -> usize {
    5
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            completion: CompletionConvention::default(),
            tag: default_tag(),
            resume_command: default_resume_command(),
            start_command: default_start_command(),
            write_tools: default_write_tools(),
            planning_dirs: default_planning_dirs(),
            context_field: ContextField::default(),
            templates_dir: None,
            list_limit: default_list_limit(),
            reminders: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// Load preferences for `workspace`.
    ///
    /// A missing file yields defaults and is not created; hooks must not
    /// leave files behind when no task is active. Missing keys in an
    /// existing file are filled in with defaults via serde.
    pub fn load(fs: &dyn FileSystem, workspace: &Workspace) -> Result<Self> {
        let path = workspace.preferences_path();
        match fs.read_optional(&path)? {
            Some(contents) => {
                toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn is_write_tool(&self, tool_name: &str) -> bool {
        self.write_tools.iter().any(|t| t == tool_name)
    }

    /// Whether `path` has a planning directory among its components.
    pub fn is_planning_path(&self, path: &Path) -> bool {
        path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|part| self.planning_dirs.iter().any(|d| d == part))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::memory::MemoryFileSystem;

    fn workspace() -> Workspace {
        Workspace::resolve(Some("/ws"), None, Path::new("/cwd"))
    }

    #[test]
    fn clean_env_path_strips_quotes_and_space() {
        assert_eq!(clean_env_path("  \"/home/me/proj\" "), "/home/me/proj");
        assert_eq!(clean_env_path("'/x'"), "/x");
        assert_eq!(clean_env_path("/plain"), "/plain");
    }

    #[test]
    fn workspace_falls_back_to_cwd() {
        let ws = Workspace::resolve(None, None, Path::new("/cwd"));
        assert_eq!(ws.root, PathBuf::from("/cwd"));
        assert_eq!(ws.working_dir, PathBuf::from("/cwd/.agent_working_dir"));

        let ws = Workspace::resolve(Some("  "), Some(""), Path::new("/cwd"));
        assert_eq!(ws.root, PathBuf::from("/cwd"));
    }

    #[test]
    fn workspace_honors_working_dir_override() {
        let ws = Workspace::resolve(Some("/ws"), Some("'/elsewhere/state'"), Path::new("/cwd"));
        assert_eq!(ws.root, PathBuf::from("/ws"));
        assert_eq!(ws.working_dir, PathBuf::from("/elsewhere/state"));
        assert_eq!(ws.pointer_path(), PathBuf::from("/elsewhere/state/current_task.json"));
    }

    #[test]
    fn relative_overrides_are_anchored_at_cwd() {
        let ws = Workspace::resolve(Some("."), None, Path::new("/cwd"));
        assert_eq!(ws.root, PathBuf::from("/cwd"));
        assert_eq!(ws.working_dir, PathBuf::from("/cwd/.agent_working_dir"));

        let ws = Workspace::resolve(Some("proj"), Some("./state"), Path::new("/cwd"));
        assert_eq!(ws.root, PathBuf::from("/cwd/proj"));
        assert_eq!(ws.working_dir, PathBuf::from("/cwd/state"));
        assert_eq!(ws.pointer_path(), PathBuf::from("/cwd/state/current_task.json"));
    }

    #[test]
    fn display_path_is_relative_inside_root() {
        let ws = workspace();
        assert_eq!(ws.display_path(Path::new("/ws/src/lib.rs")), "src/lib.rs");
        assert_eq!(ws.display_path(Path::new("/other/file.rs")), "/other/file.rs");
    }

    #[test]
    fn load_missing_file_is_default_and_not_created() {
        let fs = MemoryFileSystem::new();
        let prefs = Preferences::load(&fs, &workspace()).unwrap();
        assert_eq!(prefs.tag, "taskfiles");
        assert_eq!(prefs.completion, CompletionConvention::StatusTags);
        assert_eq!(prefs.list_limit, 5);
        assert!(!fs.exists(&workspace().preferences_path()));
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let fs = MemoryFileSystem::new().with_file(
            "/ws/.agent_working_dir/taskfiles.toml",
            r#"
completion = "checkboxes"
context_field = "context"
tag = "omg"

[reminders]
file_read = "read {{ path }}"
"#,
        );
        let prefs = Preferences::load(&fs, &workspace()).unwrap();
        assert_eq!(prefs.completion, CompletionConvention::Checkboxes);
        assert_eq!(prefs.context_field, ContextField::Context);
        assert_eq!(prefs.tag, "omg");
        assert_eq!(prefs.resume_command, "/planning:resume");
        assert_eq!(prefs.reminders["file_read"], "read {{ path }}");
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let fs = MemoryFileSystem::new()
            .with_file("/ws/.agent_working_dir/taskfiles.toml", "completion = [");
        let err = Preferences::load(&fs, &workspace()).unwrap_err();
        assert!(format!("{err:#}").contains("taskfiles.toml"));
    }

    #[test]
    fn planning_path_matches_components_only() {
        let prefs = Preferences::default();
        assert!(prefs.is_planning_path(Path::new("/ws/.agent_working_dir/task_x/progress.md")));
        assert!(prefs.is_planning_path(Path::new(".gemini/settings.json")));
        assert!(!prefs.is_planning_path(Path::new("/ws/src/agent_working_dir.rs")));
    }

    #[test]
    fn write_tools_cover_both_hosts() {
        let prefs = Preferences::default();
        assert!(prefs.is_write_tool("write_file"));
        assert!(prefs.is_write_tool("Edit"));
        assert!(!prefs.is_write_tool("read_file"));
    }
}
