//! The task commands: `start`, `resume` and `list`.
//!
//! Each command returns a report value whose `Display` impl is the console
//! output, so the flows can be tested without capturing stdout.

use crate::config::{Preferences, Workspace};
use crate::fs::FileSystem;
use crate::plan;
use crate::store::{PointerState, TaskStore};
use crate::task_dir::{self, Artifact, EnsureOutcome, TaskSummary};
use anyhow::Result;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Task commands for one workspace.
pub struct Tasks<'a> {
    fs: &'a dyn FileSystem,
    workspace: &'a Workspace,
    prefs: &'a Preferences,
    store: TaskStore<'a>,
}

impl<'a> Tasks<'a> {
    pub fn new(fs: &'a dyn FileSystem, workspace: &'a Workspace, prefs: &'a Preferences) -> Self {
        Self {
            fs,
            workspace,
            prefs,
            store: TaskStore::new(fs, &workspace.working_dir, workspace.pointer_path()),
        }
    }

    /// Where artifact templates come from: `explicit` (flag or env), then
    /// the `templates_dir` preference, then `<working_dir>/templates`.
    /// A relative preference is taken from the workspace root.
    pub fn templates_dir(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(dir) = explicit {
            return dir.to_path_buf();
        }
        match &self.prefs.templates_dir {
            Some(dir) => self.workspace.root.join(dir),
            None => self.workspace.working_dir.join("templates"),
        }
    }

    /// Create (or reopen) the task for `label` on `date` and make it current.
    pub fn start(&self, label: &str, date: NaiveDate, templates: &Path) -> Result<StartReport> {
        let working_dir = &self.workspace.working_dir;
        let working_dir_created = !self.fs.is_dir(working_dir);
        if working_dir_created {
            self.fs.create_dir_all(working_dir)?;
        }

        let task_dir = task_dir::resolve(working_dir, label, date);
        let outcome = task_dir::ensure(self.fs, &task_dir, templates)?;
        self.store.set(&task_dir)?;
        info!(task = %task_dir.display(), "task started");

        Ok(StartReport {
            tag: self.prefs.tag.clone(),
            label: label.to_string(),
            working_dir: working_dir_created.then(|| working_dir.clone()),
            task_dir,
            outcome,
        })
    }

    /// Report on the current task without changing anything.
    pub fn resume(&self) -> Result<ResumeReport> {
        let outcome = match self.store.inspect() {
            PointerState::Missing => ResumeOutcome::NoPointer,
            PointerState::Invalid(reason) => ResumeOutcome::InvalidPointer(reason),
            PointerState::Empty => ResumeOutcome::NoActiveTask,
            PointerState::Active(dir) if !self.fs.is_dir(&dir) => {
                ResumeOutcome::MissingDirectory(dir)
            }
            PointerState::Active(dir) => {
                let found = Artifact::ALL
                    .into_iter()
                    .filter(|a| self.fs.exists(&a.path_in(&dir)))
                    .collect();
                let signal = self
                    .fs
                    .read_optional(&Artifact::Plan.path_in(&dir))?
                    .map(|text| plan::parse(&text))
                    .unwrap_or_default();
                ResumeOutcome::Ready {
                    task_dir: dir,
                    found,
                    goal: signal.goal,
                    current_phase: signal.current_phase,
                }
            }
        };
        let report = ResumeReport {
            tag: self.prefs.tag.clone(),
            outcome,
        };
        debug!(resumed = report.resumed(), outcome = ?report.outcome, "resume");
        Ok(report)
    }

    /// The most recently touched tasks, newest first.
    pub fn list(&self, limit: Option<usize>) -> Result<ListReport> {
        let limit = limit.unwrap_or(self.prefs.list_limit);
        let current = self.store.get();
        let tasks = task_dir::list(
            self.fs,
            &self.workspace.working_dir,
            current.as_deref(),
            limit,
        )?;
        Ok(ListReport {
            tag: self.prefs.tag.clone(),
            start_command: self.prefs.start_command.clone(),
            resume_command: self.prefs.resume_command.clone(),
            working_dir_exists: self.fs.is_dir(&self.workspace.working_dir),
            tasks,
        })
    }
}

// ===================================================================
// start
// ===================================================================

#[derive(Debug)]
pub struct StartReport {
    pub tag: String,
    pub label: String,
    /// Set when this call created the working directory.
    pub working_dir: Option<PathBuf>,
    pub task_dir: PathBuf,
    pub outcome: EnsureOutcome,
}

impl fmt::Display for StartReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = &self.tag;
        let dir = self.task_dir.display();
        if let Some(working_dir) = &self.working_dir {
            writeln!(f, "[{tag}] Created working directory: {}", working_dir.display())?;
        }
        if self.outcome.created {
            writeln!(f, "[{tag}] Created task directory: {dir}")?;
        } else {
            writeln!(f, "[{tag}] Task directory already exists: {dir}")?;
        }
        for artifact in &self.outcome.seeded {
            writeln!(f, "[{tag}] Created {}", artifact.file_name())?;
        }
        writeln!(f, "[{tag}] Updated current_task.json")?;
        writeln!(f)?;
        writeln!(f, "[{tag}] Task started: {}", self.label)?;
        writeln!(f, "[{tag}] Task directory: {dir}")?;
        writeln!(f)?;
        write!(f, "TASK_DIR={dir}")
    }
}

// ===================================================================
// resume
// ===================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum ResumeOutcome {
    NoPointer,
    InvalidPointer(String),
    NoActiveTask,
    MissingDirectory(PathBuf),
    Ready {
        task_dir: PathBuf,
        found: Vec<Artifact>,
        goal: Option<String>,
        current_phase: Option<String>,
    },
}

#[derive(Debug)]
pub struct ResumeReport {
    pub tag: String,
    pub outcome: ResumeOutcome,
}

impl ResumeReport {
    pub fn resumed(&self) -> bool {
        matches!(self.outcome, ResumeOutcome::Ready { .. })
    }
}

impl fmt::Display for ResumeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = &self.tag;
        let (task_dir, found, goal, current_phase) = match &self.outcome {
            ResumeOutcome::NoPointer => {
                writeln!(f, "[{tag}] No current_task.json found. No task to resume.")?;
                return write!(f, "TASK_RESUMED=false");
            }
            ResumeOutcome::InvalidPointer(reason) => {
                writeln!(f, "[{tag}] current_task.json is invalid: {reason}")?;
                return write!(f, "TASK_RESUMED=false");
            }
            ResumeOutcome::NoActiveTask => {
                writeln!(f, "[{tag}] No active task in current_task.json")?;
                return write!(f, "TASK_RESUMED=false");
            }
            ResumeOutcome::MissingDirectory(dir) => {
                writeln!(f, "[{tag}] Task directory no longer exists: {}", dir.display())?;
                return write!(f, "TASK_RESUMED=false");
            }
            ResumeOutcome::Ready {
                task_dir,
                found,
                goal,
                current_phase,
            } => (task_dir, found, goal, current_phase),
        };

        writeln!(f, "[{tag}] Resuming task: {}", task_dir.display())?;
        if !found.contains(&Artifact::Plan) {
            writeln!(f, "[{tag}] Warning: No task_plan.md found")?;
        }
        for artifact in found {
            writeln!(f, "[{tag}] Found: {}", artifact.file_name())?;
        }
        if let Some(goal) = goal {
            writeln!(f, "\n[{tag}] Goal: {goal}")?;
        }
        if let Some(phase) = current_phase {
            writeln!(f, "[{tag}] Current: {phase}")?;
        }
        writeln!(
            f,
            "\n[{tag}] Ready to resume ({}/{} planning files)",
            found.len(),
            Artifact::ALL.len()
        )?;
        writeln!(f, "TASK_RESUMED=true")?;
        write!(f, "TASK_DIR={}", task_dir.display())
    }
}

// ===================================================================
// list
// ===================================================================

#[derive(Debug)]
pub struct ListReport {
    pub tag: String,
    pub start_command: String,
    pub resume_command: String,
    pub working_dir_exists: bool,
    pub tasks: Vec<TaskSummary>,
}

impl fmt::Display for ListReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = &self.tag;
        writeln!(f, "[{tag}] Listing all tasks...\n")?;

        if self.tasks.is_empty() {
            if self.working_dir_exists {
                writeln!(f, "[{tag}] No tasks found")?;
            } else {
                writeln!(f, "[{tag}] No tasks found (working directory does not exist)")?;
            }
            return write!(
                f,
                "[{tag}] Use {} [task-name] to create your first task",
                self.start_command
            );
        }

        writeln!(f, "Found {} task(s):\n", self.tasks.len())?;
        for task in &self.tasks {
            let status = if task.is_current { "* ACTIVE" } else { "  " };
            let date = task
                .modified
                .map(|m| m.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".into());
            writeln!(f, "{status} {}", task.label)?;
            writeln!(f, "   Date: {date}")?;
            writeln!(f, "   Goal: {}", task.goal.as_deref().unwrap_or("No goal set"))?;
            writeln!(f, "   Path: {}", task.path.display())?;
            writeln!(f)?;
        }
        writeln!(f, "[{tag}] Use {} to resume the active task", self.resume_command)?;
        write!(f, "[{tag}] Use {} [new-task] to create a new task", self.start_command)
    }
}
