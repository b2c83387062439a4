use crate::fs::FileSystem;
use crate::plan;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const TASK_PREFIX: &str = "task_";

/// Goals longer than this are cut in task listings.
const LIST_GOAL_WIDTH: usize = 60;

/// The three files kept in every task directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Plan,
    Findings,
    Progress,
}

impl Artifact {
    pub const ALL: [Artifact; 3] = [Artifact::Plan, Artifact::Findings, Artifact::Progress];

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Plan => "task_plan.md",
            Artifact::Findings => "findings.md",
            Artifact::Progress => "progress.md",
        }
    }

    pub fn path_in(self, task_dir: &Path) -> PathBuf {
        task_dir.join(self.file_name())
    }
}

/// Lowercase `label` and collapse every run of characters outside
/// `[a-z0-9]` into a single `_`, with no `_` at either end.
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut gap = false;
    for ch in label.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.push(ch);
        } else {
            gap = true;
        }
    }
    out
}

/// `task_<slug>_<YYYY-MM-DD>`.
pub fn dir_name(label: &str, date: NaiveDate) -> String {
    format!("{TASK_PREFIX}{}_{}", slug(label), date.format("%Y-%m-%d"))
}

/// Directory of the task named `label` started on `date`.
pub fn resolve(working_dir: &Path, label: &str, date: NaiveDate) -> PathBuf {
    working_dir.join(dir_name(label, date))
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^task_(.+)_(\d{4}-\d{2}-\d{2})$").expect("valid regex"))
}

/// Human-readable label recovered from a task directory name.
pub fn display_label(dir_name: &str) -> String {
    match name_pattern().captures(dir_name) {
        Some(caps) => caps[1].replace('_', " "),
        None => dir_name.to_string(),
    }
}

/// Label of the directory at `task_dir` as shown in session notices:
/// the name without its `task_` prefix, date kept, underscores as spaces.
pub fn label_of(task_dir: &Path) -> String {
    let name = task_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.strip_prefix(TASK_PREFIX).unwrap_or(name).replace('_', " ")
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnsureOutcome {
    /// The task directory did not exist before this call.
    pub created: bool,
    /// Artifacts copied from a template during this call.
    pub seeded: Vec<Artifact>,
}

/// Create `task_dir` and seed any missing artifact from `templates`.
///
/// Safe to repeat: existing artifacts are never touched, and an artifact
/// without a template is simply left out. Filesystem errors propagate.
pub fn ensure(fs: &dyn FileSystem, task_dir: &Path, templates: &Path) -> Result<EnsureOutcome> {
    let created = !fs.is_dir(task_dir);
    if created {
        fs.create_dir_all(task_dir)?;
    }

    let mut seeded = Vec::new();
    for artifact in Artifact::ALL {
        let target = artifact.path_in(task_dir);
        let template = templates.join(artifact.file_name());
        if fs.exists(&target) {
            continue;
        }
        if !fs.exists(&template) {
            debug!(template = %template.display(), "no template, skipping");
            continue;
        }
        fs.copy(&template, &target)?;
        seeded.push(artifact);
    }

    Ok(EnsureOutcome { created, seeded })
}

/// One row of a task listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub label: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
    pub goal: Option<String>,
    pub is_current: bool,
}

/// The `limit` most recently modified task directories, newest first.
pub fn list(
    fs: &dyn FileSystem,
    working_dir: &Path,
    current: Option<&Path>,
    limit: usize,
) -> Result<Vec<TaskSummary>> {
    if !fs.is_dir(working_dir) {
        return Ok(Vec::new());
    }

    let mut entries: Vec<_> = fs
        .list_dir(working_dir)?
        .into_iter()
        .filter(|e| e.is_dir && e.name.starts_with(TASK_PREFIX))
        .collect();
    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
    entries.truncate(limit);

    let summaries = entries
        .into_iter()
        .map(|entry| {
            let path = working_dir.join(&entry.name);
            // An unreadable plan only costs the goal column.
            let goal = fs
                .read_optional(&Artifact::Plan.path_in(&path))
                .ok()
                .flatten()
                .and_then(|text| plan::parse(&text).goal)
                .map(|goal| plan::truncate(&goal, LIST_GOAL_WIDTH));
            TaskSummary {
                label: display_label(&entry.name),
                is_current: current == Some(path.as_path()),
                modified: entry.modified.map(DateTime::<Utc>::from),
                path,
                goal,
            }
        })
        .collect();
    Ok(summaries)
}
