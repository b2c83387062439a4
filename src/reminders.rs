//! The fixed set of reminder texts injected by the hooks.
//!
//! Each reminder is a small minijinja template. Users may replace any of
//! them from the `[reminders]` table of `taskfiles.toml`.

use minijinja::{Environment, Value};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    FileRead,
    FileModified,
    Orchestrator,
    PlanContext,
    VerifySubagent,
    SessionStartComplete,
    SessionStartIncomplete,
    SessionStartContext,
    SessionEndComplete,
    SessionEndIncomplete,
}

impl Reminder {
    pub const ALL: [Reminder; 10] = [
        Reminder::FileRead,
        Reminder::FileModified,
        Reminder::Orchestrator,
        Reminder::PlanContext,
        Reminder::VerifySubagent,
        Reminder::SessionStartComplete,
        Reminder::SessionStartIncomplete,
        Reminder::SessionStartContext,
        Reminder::SessionEndComplete,
        Reminder::SessionEndIncomplete,
    ];

    /// Key used in the `[reminders]` preferences table.
    pub fn name(self) -> &'static str {
        match self {
            Reminder::FileRead => "file_read",
            Reminder::FileModified => "file_modified",
            Reminder::Orchestrator => "orchestrator",
            Reminder::PlanContext => "plan_context",
            Reminder::VerifySubagent => "verify_subagent",
            Reminder::SessionStartComplete => "session_start_complete",
            Reminder::SessionStartIncomplete => "session_start_incomplete",
            Reminder::SessionStartContext => "session_start_context",
            Reminder::SessionEndComplete => "session_end_complete",
            Reminder::SessionEndIncomplete => "session_end_incomplete",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            Reminder::FileRead => FILE_READ,
            Reminder::FileModified => FILE_MODIFIED,
            Reminder::Orchestrator => ORCHESTRATOR,
            Reminder::PlanContext => PLAN_CONTEXT,
            Reminder::VerifySubagent => VERIFY_SUBAGENT,
            Reminder::SessionStartComplete => {
                "[{{ tag }}] Previous task '{{ label }}' completed! Current reset."
            }
            Reminder::SessionStartIncomplete => SESSION_START_INCOMPLETE,
            Reminder::SessionStartContext => {
                "Active task: {{ task_dir }}\nSession ID: {{ session_id }}"
            }
            Reminder::SessionEndComplete => "[{{ tag }}] Task '{{ label }}' completed and reset.",
            Reminder::SessionEndIncomplete => concat!(
                "[{{ tag }}] Session ended. Task '{{ label }}' saved. ",
                "Run {{ resume_command }} to continue."
            ),
        }
    }
}

const FILE_READ: &str = r#"

---

**[{{ tag }}] {% if path %}File Read: {{ path }}{% else %}You just read a file.{% endif %}**

If this contains useful information for your current task, add key findings to **findings.md**.

findings.md: `{{ findings }}`
"#;

const FILE_MODIFIED: &str = r#"

---

**[{{ tag }}] {% if path %}File Modified: {{ path }}{% else %}You just modified a file.{% endif %}**

If this write completes a task step, update right away instead of batching it up:

1. **task_plan.md** - mark the step complete: `{{ plan }}`
2. **progress.md** - record what was accomplished: `{{ progress }}`
3. **findings.md** - add anything newly learned: `{{ findings }}`

**Current Task Folder:** `{{ task_dir }}`

> Temporary files (test files, scripts, scratch pads) created during this task
> can be written within the task folder to keep the workspace organized.
"#;

const ORCHESTRATOR: &str = r#"

---

**[{{ tag }}] ORCHESTRATOR REMINDER**

You are about to directly modify a file outside planning directories: `{{ path }}`

As an ORCHESTRATOR:
- Consider DELEGATING to a subagent instead
- If you must modify directly, keep it minimal
- After modifying, update **progress.md** with what was done: `{{ progress }}`

**Delegation is preferred for substantial work.**
{% if goal or phase %}
{% if goal %}Goal: {{ goal }}
{% endif %}{% if phase %}Current: {{ phase }}
{% endif %}{% endif %}"#;

const PLAN_CONTEXT: &str = r#"[{{ tag }}] Plan context:
{% if goal %}Goal: {{ goal }}
{% endif %}{% if phase %}Current: {{ phase }}
{% endif %}Plan: `{{ plan }}`"#;

const VERIFY_SUBAGENT: &str = r#"

---

**[{{ tag }}] SUBAGENT COMPLETED - VERIFY BEFORE TRUSTING**

**PHASE 1: READ THE CODE**
1. `git diff --stat` - see what changed
2. Read EVERY changed file - no exceptions
3. Check for: stubs, TODOs, logic errors, scope creep

**PHASE 2: RUN DIAGNOSTICS**
1. Diagnostics on each changed file - zero errors
2. Run relevant tests

**PHASE 3: UPDATE PROGRESS**
- If verified complete: mark phase done in **progress.md** (`{{ progress }}`)
- If issues found: note in progress, plan fix

**DO NOT proceed until verified.**
"#;

const SESSION_START_INCOMPLETE: &str = r#"[{{ tag }}] Found incomplete task: '{{ label }}'

To continue: {{ resume_command }}
Or start new: {{ start_command }} [task]"#;

/// Renders reminders, honoring user overrides.
pub struct Reminders {
    overrides: BTreeMap<String, String>,
}

impl Reminders {
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        for name in overrides.keys() {
            if !Reminder::ALL.iter().any(|r| r.name() == name) {
                warn!(reminder = %name, "ignoring override for unknown reminder");
            }
        }
        Self {
            overrides: overrides.clone(),
        }
    }

    fn source(&self, reminder: Reminder) -> &str {
        self.overrides
            .get(reminder.name())
            .map(String::as_str)
            .unwrap_or_else(|| reminder.builtin())
    }

    pub fn render(&self, reminder: Reminder, ctx: Value) -> Result<String, minijinja::Error> {
        let env = Environment::new();
        let tmpl = env.template_from_str(self.source(reminder))?;
        tmpl.render(ctx)
    }
}
