#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Run the binary inside `workspace` with `args`, feeding `stdin`.
///
/// Inherited task environment is cleared so the host's own settings never
/// leak into a test.
pub fn run_cli(args: &[&str], workspace: &Path, stdin: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_taskfiles"))
        .args(args)
        .current_dir(workspace)
        .env("WORKSPACE_PATH", workspace)
        .env_remove("WORKING_DIR_BASE")
        .env_remove("TASKFILES_TEMPLATES")
        .env_remove("TASKFILES_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");

    // The child may exit before reading stdin (e.g. usage errors); a
    // broken pipe there is not a test failure.
    if let Err(e) = child.stdin.as_mut().unwrap().write_all(stdin.as_bytes()) {
        assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe, "stdin write failed: {e}");
    }

    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Run `hook <kind>` and parse its single line of JSON output.
pub fn run_hook(kind: &str, workspace: &Path, payload: &str) -> serde_json::Value {
    let (code, stdout, stderr) = run_cli(&["hook", kind], workspace, payload);
    assert_eq!(code, 0, "hook {kind} exited {code}: {stderr}");
    assert_eq!(stdout.lines().count(), 1, "expected one JSON line, got: {stdout}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON {stdout:?}: {e}"))
}

pub const PLAIN_ALLOW: &str = r#"{"decision":"allow"}"#;

pub const HOOK_KINDS: [&str; 6] = [
    "session-start",
    "session-end",
    "pre-tool",
    "post-tool",
    "after-read",
    "after-write",
];

/// Temp workspace with artifact templates under `.agent_working_dir/templates`.
pub fn workspace_with_templates() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join(".agent_working_dir").join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(
        templates.join("task_plan.md"),
        "# Task Plan\n\n## Goal\n(describe the goal)\n\n\
         ## Current Phase\nPhase 1\n\n\
         ### Phase 1\n- **Status:** in_progress\n",
    )
    .unwrap();
    fs::write(templates.join("findings.md"), "# Findings\n").unwrap();
    fs::write(templates.join("progress.md"), "# Progress\n").unwrap();
    dir
}

/// The `TASK_DIR=` value printed by `start` and `resume`.
pub fn task_dir_line(stdout: &str) -> PathBuf {
    let line = stdout
        .lines()
        .find_map(|l| l.strip_prefix("TASK_DIR="))
        .unwrap_or_else(|| panic!("no TASK_DIR line in {stdout:?}"));
    PathBuf::from(line)
}

pub fn read_pointer(workspace: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(workspace.join(".agent_working_dir/current_task.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Some payload each hook kind accepts.
pub fn sample_payload(kind: &str) -> String {
    match kind {
        "session-start" | "session-end" => r#"{"session_id":"test-session"}"#.to_string(),
        "post-tool" => r#"{"tool_name":"Task","tool_response":"done"}"#.to_string(),
        _ => r#"{"tool_name":"write_file","tool_input":{"file_path":"src/main.rs"}}"#.to_string(),
    }
}
