mod completion;
mod config;
mod dispatch;
mod fs;
mod lifecycle;
mod plan;
mod reminders;
mod store;
mod task_dir;
mod types;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use config::{Preferences, Workspace};
use dispatch::{Diagnostic, HookDispatcher, fail_open};
use fs::{FileSystem, LiveFileSystem};
use lifecycle::Tasks;
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use types::{HookDecision, HookKind};

/// Task lifecycle and hook dispatch for coding-agent hosts.
#[derive(Parser)]
#[command(name = "taskfiles", version)]
struct Cli {
    /// Workspace root; defaults to the current directory.
    #[arg(long, global = true, env = "WORKSPACE_PATH")]
    workspace: Option<String>,

    /// Directory holding task state; defaults to `<workspace>/.agent_working_dir`.
    #[arg(long, global = true, env = "WORKING_DIR_BASE")]
    working_dir: Option<String>,

    /// Log at debug level on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a host lifecycle hook. Reads JSON on stdin, writes JSON on stdout.
    Hook {
        #[arg(value_enum)]
        kind: HookKind,
    },
    #[command(flatten)]
    Task(TaskCommand),
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create or reopen a task and make it current.
    Start {
        #[arg(default_value = "default")]
        label: String,
        /// Start date used in the directory name (UTC today by default).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Directory with task_plan.md, findings.md and progress.md templates.
        #[arg(long, env = "TASKFILES_TEMPLATES")]
        templates: Option<PathBuf>,
    },
    /// Show the current task and its planning files.
    Resume,
    /// List recent tasks, newest first.
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TASKFILES_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Every failure on this path ends in an allow.
fn run_hook(fs: &dyn FileSystem, workspace: &Workspace, kind: HookKind) -> HookDecision {
    let raw = match read_stdin() {
        Ok(raw) => raw,
        Err(err) => return fail_open(kind, &Diagnostic::from(err)),
    };
    let prefs = match Preferences::load(fs, workspace) {
        Ok(prefs) => prefs,
        Err(err) => return fail_open(kind, &Diagnostic::from(err)),
    };
    HookDispatcher::new(fs, workspace, &prefs).run(kind, &raw)
}

fn run_task_command(
    fs: &dyn FileSystem,
    workspace: &Workspace,
    command: TaskCommand,
) -> Result<()> {
    let prefs = Preferences::load(fs, workspace)?;
    let tasks = Tasks::new(fs, workspace, &prefs);
    match command {
        TaskCommand::Start {
            label,
            date,
            templates,
        } => {
            let templates = tasks.templates_dir(templates.as_deref());
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            println!("{}", tasks.start(&label, date, &templates)?);
        }
        TaskCommand::Resume => println!("{}", tasks.resume()?),
        TaskCommand::List { limit } => println!("{}", tasks.list(limit)?),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let workspace = Workspace::resolve(cli.workspace.as_deref(), cli.working_dir.as_deref(), &cwd);
    let fs = LiveFileSystem;

    match cli.command {
        Command::Hook { kind } => println!("{}", run_hook(&fs, &workspace, kind).to_json()),
        Command::Task(command) => {
            if let Err(err) = run_task_command(&fs, &workspace, command) {
                eprintln!("taskfiles: {err:#}");
                process::exit(1);
            }
        }
    }
}
