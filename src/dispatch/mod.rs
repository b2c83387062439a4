use crate::completion;
use crate::config::{ContextField, Preferences, Workspace};
use crate::fs::FileSystem;
use crate::plan::{self, PlanSignal};
use crate::reminders::{Reminder, Reminders};
use crate::store::TaskStore;
use crate::task_dir::{self, Artifact};
use crate::types::{
    HookDecision, HookEvent, HookKind, HookSpecificOutput, PayloadError, SessionInput,
    ToolInput, ToolResultInput,
};
use minijinja::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tool output phrases that mean the work is still running.
const BACKGROUND_MARKERS: &[&str] = &["Background task launched", "Background task continued"];

/// Goals longer than this are cut in the pre-tool plan context.
const CONTEXT_GOAL_WIDTH: usize = 100;

// ===================================================================
// Diagnostic: why a hook fell back to a plain allow
// ===================================================================

#[derive(Debug)]
pub enum Diagnostic {
    Payload(PayloadError),
    Io(anyhow::Error),
    Render(minijinja::Error),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Payload(err) => write!(f, "{err}"),
            Diagnostic::Io(err) => write!(f, "filesystem error: {err:#}"),
            Diagnostic::Render(err) => write!(f, "reminder template error: {err}"),
        }
    }
}

impl From<PayloadError> for Diagnostic {
    fn from(err: PayloadError) -> Self {
        Diagnostic::Payload(err)
    }
}

impl From<serde_json::Error> for Diagnostic {
    fn from(err: serde_json::Error) -> Self {
        Diagnostic::Payload(PayloadError::Json(err))
    }
}

impl From<anyhow::Error> for Diagnostic {
    fn from(err: anyhow::Error) -> Self {
        Diagnostic::Io(err)
    }
}

impl From<minijinja::Error> for Diagnostic {
    fn from(err: minijinja::Error) -> Self {
        Diagnostic::Render(err)
    }
}

/// Turn a failed hook into the permissive default. This is the only place
/// an error is swallowed.
pub fn fail_open(kind: HookKind, diagnostic: &Diagnostic) -> HookDecision {
    warn!(hook = %kind, "{diagnostic}; allowing");
    HookDecision::allow()
}

// ===================================================================
// Dispatcher
// ===================================================================

/// Answers every lifecycle hook for one workspace.
pub struct HookDispatcher<'a> {
    fs: &'a dyn FileSystem,
    workspace: &'a Workspace,
    prefs: &'a Preferences,
    store: TaskStore<'a>,
    reminders: Reminders,
}

impl<'a> HookDispatcher<'a> {
    pub fn new(fs: &'a dyn FileSystem, workspace: &'a Workspace, prefs: &'a Preferences) -> Self {
        Self {
            fs,
            workspace,
            prefs,
            store: TaskStore::new(fs, &workspace.working_dir, workspace.pointer_path()),
            reminders: Reminders::new(&prefs.reminders),
        }
    }

    /// Parse `raw` as a `kind` payload and answer it. Never fails.
    pub fn run(&self, kind: HookKind, raw: &str) -> HookDecision {
        let result = HookEvent::parse(kind, raw)
            .map_err(Diagnostic::from)
            .and_then(|event| self.dispatch(&event));
        match result {
            Ok(decision) => {
                debug!(
                    hook = %kind,
                    context = decision.additional_context().is_some(),
                    notice = decision.system_message.is_some(),
                    "decided"
                );
                decision
            }
            Err(diagnostic) => fail_open(kind, &diagnostic),
        }
    }

    pub fn dispatch(&self, event: &HookEvent) -> Result<HookDecision, Diagnostic> {
        let Some(task_dir) = self.store.get() else {
            debug!(hook = %event.kind(), "no active task");
            return Ok(HookDecision::allow());
        };
        let task = ActiveTask { dir: task_dir };
        debug!(hook = %event.kind(), task = %task.dir.display(), "active task");

        match event {
            HookEvent::SessionStart(input) => self.session_start(&task, input),
            HookEvent::SessionEnd(input) => self.session_end(&task, input),
            HookEvent::PreTool(input) => self.pre_tool(&task, input),
            HookEvent::PostTool(input) => self.post_tool(&task, input),
            HookEvent::AfterRead(input) => self.after_read(&task, input),
            HookEvent::AfterWrite(input) => self.after_write(&task, input),
        }
    }

    // ---------------------------------------------------------------
    // Session boundaries: the only adapters that change state
    // ---------------------------------------------------------------

    fn session_start(
        &self,
        task: &ActiveTask,
        input: &SessionInput,
    ) -> Result<HookDecision, Diagnostic> {
        let vars = self.vars(task);
        if self.is_complete(task)? {
            self.store.clear()?;
            debug!(task = %task.dir.display(), "task complete, pointer cleared");
            let message = self.render(Reminder::SessionStartComplete, vars)?;
            return Ok(self.notice(message));
        }

        let message = self.render(Reminder::SessionStartIncomplete, vars.clone())?;
        let session_id = input.session_id.as_deref().unwrap_or("unknown");
        let context = self.render(
            Reminder::SessionStartContext,
            with(vars, [("session_id", session_id.to_string())]),
        )?;
        Ok(self.with_context(self.notice(message), context))
    }

    fn session_end(
        &self,
        task: &ActiveTask,
        _input: &SessionInput,
    ) -> Result<HookDecision, Diagnostic> {
        let vars = self.vars(task);
        if self.is_complete(task)? {
            self.store.clear()?;
            debug!(task = %task.dir.display(), "task complete, pointer cleared");
            let message = self.render(Reminder::SessionEndComplete, vars)?;
            return Ok(self.notice(message));
        }
        let message = self.render(Reminder::SessionEndIncomplete, vars)?;
        Ok(self.notice(message))
    }

    // ---------------------------------------------------------------
    // Tool adapters: read-only reminders
    // ---------------------------------------------------------------

    fn pre_tool(&self, task: &ActiveTask, input: &ToolInput) -> Result<HookDecision, Diagnostic> {
        let signal = self.plan_signal(task)?;
        let goal = signal
            .goal
            .as_deref()
            .map(|g| plan::truncate(g, CONTEXT_GOAL_WIDTH))
            .unwrap_or_default();
        let phase = signal.current_phase.unwrap_or_default();
        let path = input.tool_input.path();

        let outside_planning = path.is_some_and(|p| !self.prefs.is_planning_path(Path::new(p)));
        let reminder = if self.prefs.is_write_tool(&input.tool_name) && outside_planning {
            Reminder::Orchestrator
        } else if !goal.is_empty() || !phase.is_empty() {
            Reminder::PlanContext
        } else {
            return Ok(HookDecision::allow());
        };

        let vars = with(
            self.vars(task),
            [
                ("path", path.map(|p| self.display(p)).unwrap_or_default()),
                ("goal", goal),
                ("phase", phase),
            ],
        );
        let text = self.render(reminder, vars)?;
        Ok(self.with_context(HookDecision::allow(), text))
    }

    fn post_tool(
        &self,
        task: &ActiveTask,
        input: &ToolResultInput,
    ) -> Result<HookDecision, Diagnostic> {
        let text = input.response_text();
        if BACKGROUND_MARKERS.iter().any(|m| text.contains(m)) {
            debug!(tool = %input.tool_name, "background work still running, no reminder");
            return Ok(HookDecision::allow());
        }
        let reminder = self.render(Reminder::VerifySubagent, self.vars(task))?;
        Ok(self.with_context(HookDecision::allow(), reminder))
    }

    fn after_read(&self, task: &ActiveTask, input: &ToolInput) -> Result<HookDecision, Diagnostic> {
        self.file_reminder(Reminder::FileRead, task, input)
    }

    fn after_write(
        &self,
        task: &ActiveTask,
        input: &ToolInput,
    ) -> Result<HookDecision, Diagnostic> {
        self.file_reminder(Reminder::FileModified, task, input)
    }

    fn file_reminder(
        &self,
        reminder: Reminder,
        task: &ActiveTask,
        input: &ToolInput,
    ) -> Result<HookDecision, Diagnostic> {
        let path = input
            .tool_input
            .path()
            .map(|p| self.display(p))
            .unwrap_or_default();
        let text = self.render(reminder, with(self.vars(task), [("path", path)]))?;
        Ok(self.with_context(HookDecision::allow(), text))
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Parse the task's plan; a missing plan is an empty signal.
    fn plan_signal(&self, task: &ActiveTask) -> Result<PlanSignal, Diagnostic> {
        let text = self.fs.read_optional(&task.artifact(Artifact::Plan))?;
        Ok(text.map(|t| plan::parse(&t)).unwrap_or_default())
    }

    fn is_complete(&self, task: &ActiveTask) -> Result<bool, Diagnostic> {
        let signal = self.plan_signal(task)?;
        Ok(completion::is_complete(&signal, self.prefs.completion))
    }

    fn display(&self, path: &str) -> String {
        self.workspace.display_path(Path::new(path))
    }

    /// Template variables every reminder may use.
    fn vars(&self, task: &ActiveTask) -> BTreeMap<&'static str, String> {
        let artifact = |a: Artifact| self.workspace.display_path(&task.artifact(a));
        BTreeMap::from([
            ("tag", self.prefs.tag.clone()),
            ("label", task_dir::label_of(&task.dir)),
            ("task_dir", task.dir.display().to_string()),
            ("plan", artifact(Artifact::Plan)),
            ("findings", artifact(Artifact::Findings)),
            ("progress", artifact(Artifact::Progress)),
            ("resume_command", self.prefs.resume_command.clone()),
            ("start_command", self.prefs.start_command.clone()),
        ])
    }

    fn render(
        &self,
        reminder: Reminder,
        vars: BTreeMap<&'static str, String>,
    ) -> Result<String, Diagnostic> {
        Ok(self.reminders.render(reminder, Value::from_serialize(&vars))?)
    }

    fn notice(&self, message: String) -> HookDecision {
        HookDecision {
            system_message: Some(message),
            ..HookDecision::allow()
        }
    }

    fn with_context(&self, decision: HookDecision, text: String) -> HookDecision {
        match self.prefs.context_field {
            ContextField::HookSpecificOutput => HookDecision {
                hook_specific_output: Some(HookSpecificOutput {
                    additional_context: Some(text),
                }),
                ..decision
            },
            ContextField::Context => HookDecision {
                context: Some(text),
                ..decision
            },
        }
    }
}

struct ActiveTask {
    dir: PathBuf,
}

impl ActiveTask {
    fn artifact(&self, artifact: Artifact) -> PathBuf {
        artifact.path_in(&self.dir)
    }
}

fn with<const N: usize>(
    mut vars: BTreeMap<&'static str, String>,
    extra: [(&'static str, String); N],
) -> BTreeMap<&'static str, String> {
    vars.extend(extra);
    vars
}
