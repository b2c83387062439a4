use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// ===================================================================
// Hook kinds
// ===================================================================

/// The lifecycle event a hook invocation answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookKind {
    SessionStart,
    SessionEnd,
    PreTool,
    PostTool,
    AfterRead,
    AfterWrite,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::SessionStart => "session-start",
            HookKind::SessionEnd => "session-end",
            HookKind::PreTool => "pre-tool",
            HookKind::PostTool => "post-tool",
            HookKind::AfterRead => "after-read",
            HookKind::AfterWrite => "after-write",
        };
        f.write_str(name)
    }
}

// ===================================================================
// Hook input types (received via stdin, snake_case JSON)
// ===================================================================

/// Session-boundary payload. Hosts send more, but only the id is used.
#[derive(Debug, Default, Deserialize)]
pub struct SessionInput {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The subject file of a tool call. Hosts disagree on the field name.
#[derive(Debug, Default, Deserialize)]
pub struct FileTarget {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

impl FileTarget {
    /// `file_path`, falling back to `file`; empty strings count as absent.
    pub fn path(&self) -> Option<&str> {
        [self.file_path.as_deref(), self.file.as_deref()]
            .into_iter()
            .flatten()
            .find(|p| !p.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: FileTarget,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolResultInput {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_response: serde_json::Value,
}

impl ToolResultInput {
    /// The text a human would see as the tool's output.
    ///
    /// Accepts a bare string, an MCP-style `content` array (first text
    /// item), or an object with an `output`/`stdout`/`result` string;
    /// anything else is inspected as raw JSON text.
    pub fn response_text(&self) -> String {
        let response = &self.tool_response;
        if let Some(text) = response.as_str() {
            return text.to_string();
        }
        if let Some(items) = response.get("content").and_then(|c| c.as_array()) {
            let first_text = items
                .iter()
                .find(|item| item.get("type").and_then(|t| t.as_str()) == Some("text"))
                .and_then(|item| item.get("text"))
                .and_then(|t| t.as_str());
            if let Some(text) = first_text {
                return text.to_string();
            }
        }
        for key in ["output", "stdout", "result"] {
            if let Some(text) = response.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
        if response.is_null() {
            String::new()
        } else {
            response.to_string()
        }
    }
}

/// A parsed hook payload, one variant per lifecycle event.
#[derive(Debug)]
pub enum HookEvent {
    SessionStart(SessionInput),
    SessionEnd(SessionInput),
    PreTool(ToolInput),
    PostTool(ToolResultInput),
    AfterRead(ToolInput),
    AfterWrite(ToolInput),
}

fn from_object<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, PayloadError> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject);
    }
    serde_json::from_value(value).map_err(PayloadError::Json)
}

impl HookEvent {
    /// Parse the raw stdin of a `kind` hook. The payload must be a JSON
    /// object; fields a kind does not use are ignored.
    pub fn parse(kind: HookKind, raw: &str) -> Result<Self, PayloadError> {
        if raw.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        let value: serde_json::Value = serde_json::from_str(raw).map_err(PayloadError::Json)?;
        Ok(match kind {
            HookKind::SessionStart => HookEvent::SessionStart(from_object(value)?),
            HookKind::SessionEnd => HookEvent::SessionEnd(from_object(value)?),
            HookKind::PreTool => HookEvent::PreTool(from_object(value)?),
            HookKind::PostTool => HookEvent::PostTool(from_object(value)?),
            HookKind::AfterRead => HookEvent::AfterRead(from_object(value)?),
            HookKind::AfterWrite => HookEvent::AfterWrite(from_object(value)?),
        })
    }

    pub fn kind(&self) -> HookKind {
        match self {
            HookEvent::SessionStart(_) => HookKind::SessionStart,
            HookEvent::SessionEnd(_) => HookKind::SessionEnd,
            HookEvent::PreTool(_) => HookKind::PreTool,
            HookEvent::PostTool(_) => HookKind::PostTool,
            HookEvent::AfterRead(_) => HookKind::AfterRead,
            HookEvent::AfterWrite(_) => HookKind::AfterWrite,
        }
    }
}

#[derive(Debug)]
pub enum PayloadError {
    Empty,
    NotAnObject,
    Json(serde_json::Error),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Empty => write!(f, "empty hook payload"),
            PayloadError::NotAnObject => write!(f, "hook payload is not a JSON object"),
            PayloadError::Json(err) => write!(f, "invalid hook payload: {err}"),
        }
    }
}

// ===================================================================
// Hook output (written to stdout as JSON, camelCase)
// ===================================================================

/// The only decision ever produced; hooks never block the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Allow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// Top-level hook output written to stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDecision {
    pub decision: Decision,

    /// Reminder text injected into the agent's context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,

    /// Same as `hook_specific_output`, for runners that read a flat field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Notice shown to the user (session boundaries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookDecision {
    pub fn allow() -> Self {
        Self::default()
    }

    /// The reminder text, wherever it was placed.
    pub fn additional_context(&self) -> Option<&str> {
        self.hook_specific_output
            .as_ref()
            .and_then(|o| o.additional_context.as_deref())
            .or(self.context.as_deref())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"decision":"allow"}"#.to_string())
    }
}
