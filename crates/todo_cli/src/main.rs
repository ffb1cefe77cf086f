//! Terminal front-end for the to-do list.
//!
//! # Responsibility
//! - Map one command line to one presenter action.
//! - Print the resulting screen once the action has been applied.

use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use todo_core::db::open_db;
use todo_core::{
    default_log_level, init_logging, MirrorConfig, PersistPolicy, SqliteTaskRepository,
    StoreConfig, TaskFilter, TaskId, TaskListPresenter, TaskListScreen, TaskListView, TaskMirror,
    TaskRow, TaskStore,
};

#[derive(Debug, Parser)]
#[command(name = "todo", version, about = "Single-list to-do manager")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "TODO_DB_PATH", default_value = "todo.sqlite3")]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, env = "TODO_LOG_DIR")]
    log_dir: Option<String>,

    #[arg(long, env = "TODO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base URL to mirror newly created tasks to (`<url>/rest/todos`).
    #[arg(long, env = "TODO_MIRROR_URL")]
    mirror_url: Option<String>,

    /// Which tasks to show: all, active or completed.
    #[arg(long, short, default_value = "all")]
    filter: TaskFilter,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a task.
    Add { text: Vec<String> },
    /// Show the list (default).
    List,
    /// Flip completion of a task, by row number or id prefix.
    Toggle { task: String },
    /// Replace a task's text; empty text deletes it.
    Edit { task: String, text: Vec<String> },
    /// Delete a task.
    Rm { task: String },
    /// Delete every completed task.
    ClearCompleted,
}

/// Keeps only the latest screen; printed once per invocation.
#[derive(Clone, Default)]
struct TerminalView {
    latest: Rc<RefCell<Option<TaskListScreen>>>,
}

impl TaskListView for TerminalView {
    fn render(&mut self, screen: &TaskListScreen) {
        *self.latest.borrow_mut() = Some(screen.clone());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        if let Err(err) = init_logging(&level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let conn = open_db(&cli.db)
        .map_err(|err| format!("cannot open `{}`: {err}", cli.db.display()))?;
    let repo = SqliteTaskRepository::try_new(&conn).map_err(|err| err.to_string())?;
    // A write that fails to persist is rolled back and reported.
    let config = StoreConfig {
        persist_policy: PersistPolicy::Strict,
    };
    let store = Rc::new(RefCell::new(TaskStore::with_config(repo, config)));

    let in_flight = match cli.mirror_url.as_deref() {
        Some(url) => {
            let config = MirrorConfig::new(url, None).map_err(|err| err.to_string())?;
            let mirror = TaskMirror::http(&config);
            let in_flight = mirror.in_flight();
            store.borrow_mut().subscribe(mirror);
            Some(in_flight)
        }
        None => None,
    };

    let view = TerminalView::default();
    let presenter = TaskListPresenter::new(Rc::clone(&store), view.clone());
    presenter.select_filter(cli.filter);

    let saved = match cli.command.unwrap_or(Command::List) {
        Command::Add { text } => {
            let text = text.join(" ");
            text.trim().is_empty() || presenter.submit(&text)
        }
        Command::List => true,
        Command::Toggle { task } => presenter.toggle(resolve(&view, &task)?),
        Command::Edit { task, text } => presenter.edit(resolve(&view, &task)?, &text.join(" ")),
        Command::Rm { task } => presenter.delete(resolve(&view, &task)?),
        Command::ClearCompleted => {
            let completed = store.borrow().count(TaskFilter::Completed);
            presenter.clear_completed() == completed
        }
    };

    if let Some(screen) = view.latest.borrow().as_ref() {
        print_screen(screen);
    }
    drop(presenter);
    if let Some(in_flight) = &in_flight {
        in_flight.wait();
    }

    if saved {
        Ok(())
    } else {
        Err(format!(
            "change could not be saved to `{}`; nothing was modified",
            cli.db.display()
        ))
    }
}

/// Resolves a task reference against the shown list.
///
/// `#N` always names row `N` (1-based). A bare number names a row when that
/// row exists and is otherwise tried as an id prefix, so all-digit prefixes
/// stay reachable.
fn resolve(view: &TerminalView, reference: &str) -> Result<TaskId, String> {
    let latest = view.latest.borrow();
    let rows = latest
        .as_ref()
        .map(|screen| screen.rows.as_slice())
        .unwrap_or_default();
    let reference = reference.trim();

    if let Some(row) = reference.strip_prefix('#') {
        let number = row
            .parse::<usize>()
            .map_err(|_| format!("invalid row `{reference}`"))?;
        return row_id(rows, number).ok_or_else(|| format!("no task at row {number}"));
    }
    if let Some(id) = reference
        .parse::<usize>()
        .ok()
        .and_then(|number| row_id(rows, number))
    {
        return Ok(id);
    }

    let needle = reference.to_ascii_lowercase();
    let mut matches = rows
        .iter()
        .filter(|row| row.id.to_string().starts_with(needle.as_str()));
    match (matches.next(), matches.next()) {
        (Some(row), None) if !needle.is_empty() => Ok(row.id),
        (Some(_), Some(_)) => Err(format!("id prefix `{reference}` is ambiguous")),
        _ => Err(format!("no task matches `{reference}`")),
    }
}

fn row_id(rows: &[TaskRow], number: usize) -> Option<TaskId> {
    number
        .checked_sub(1)
        .and_then(|index| rows.get(index))
        .map(|row| row.id)
}

fn print_screen(screen: &TaskListScreen) {
    if screen.rows.is_empty() {
        println!("(no {} tasks)", screen.filter);
    }
    for (index, row) in screen.rows.iter().enumerate() {
        let mark = if row.completed { "x" } else { " " };
        let id = row.id.to_string();
        println!("{:>3}. [{mark}] {}  {}", index + 1, row.label, &id[..8]);
    }
    println!("{}", screen.items_left);
}
