//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the task list use-cases to Dart via FRB.
//! - Keep error semantics simple: envelopes with `ok` + message.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call opens its own connection; no state is held between calls.
//! - Stores run with `PersistPolicy::Strict`, so `ok=true` means the change
//!   is on disk.

use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use todo_core::db::open_db;
use todo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    DisplayString, EnglishStrings, PersistPolicy, SqliteTaskRepository, StoreConfig, Task,
    TaskFilter, TaskId, TaskStore, UpdateOutcome,
};

const TASK_DB_FILE_NAME: &str = "todo.sqlite3";
static TASK_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One task as shown by the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub task_id: String,
    pub label: String,
    pub completed: bool,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
}

/// List response for one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    /// Tasks passing the filter, oldest first.
    pub items: Vec<TaskItem>,
    /// Active tasks across the whole list.
    pub active_count: u32,
    /// Localized footer, e.g. `2 items left`.
    pub items_left: String,
    pub message: String,
}

/// Envelope for mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    pub ok: bool,
    /// Affected task, when one exists after the call.
    pub task: Option<TaskItem>,
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task: Option<&Task>) -> Self {
        Self {
            ok: true,
            task: task.map(to_task_item),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            message: message.into(),
        }
    }
}

/// Localized static strings of the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenStrings {
    pub task_list: String,
    pub create_task_field: String,
    pub task_placeholder: String,
    pub clear_completed: String,
    pub filter_all: String,
    pub filter_active: String,
    pub filter_completed: String,
}

/// Lists tasks for `filter` (`all|active|completed`).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Unknown filters return `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_list(filter: String) -> TaskListResponse {
    let result = filter
        .parse::<TaskFilter>()
        .and_then(|filter| with_store(|store| list_snapshot(store, filter)));

    match result {
        Ok((items, active_count)) => TaskListResponse {
            ok: true,
            message: format!("{} task(s).", items.len()),
            items,
            active_count,
            items_left: items_left_text(active_count),
        },
        Err(err) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            active_count: 0,
            items_left: items_left_text(0),
            message: format!("task_list failed: {err}"),
        },
    }
}

/// Creates a task from text field input.
///
/// Blank input is not an error: returns `ok=true` with no task.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(content: String) -> TaskActionResponse {
    if content.trim().is_empty() {
        return TaskActionResponse::success("Nothing to create.", None);
    }
    match with_store(|store| store.create_task(&content)) {
        Ok(Some(task)) => TaskActionResponse::success("Task created.", Some(&task)),
        Ok(None) => TaskActionResponse::failure("task_create was rolled back"),
        Err(err) => TaskActionResponse::failure(format!("task_create failed: {err}")),
    }
}

/// Replaces a task's text; blank text deletes the task.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(task_id: String, content: String) -> TaskActionResponse {
    let outcome = parse_task_id(&task_id)
        .and_then(|id| with_store(|store| store.update_task(id, &content)));
    match outcome {
        Ok(UpdateOutcome::Updated(task)) => {
            TaskActionResponse::success("Task updated.", Some(&task))
        }
        Ok(UpdateOutcome::Deleted) => TaskActionResponse::success("Task deleted.", None),
        Ok(UpdateOutcome::Missing) => {
            TaskActionResponse::failure(format!("task not found: {task_id}"))
        }
        Ok(UpdateOutcome::RolledBack) => {
            TaskActionResponse::failure("task_update was rolled back")
        }
        Err(err) => TaskActionResponse::failure(format!("task_update failed: {err}")),
    }
}

/// Flips a task's completion flag.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle(task_id: String) -> TaskActionResponse {
    let toggled = parse_task_id(&task_id).and_then(|id| {
        with_store(|store| store.get_task(id).is_some().then(|| store.toggle_task(id)))
    });
    match toggled {
        Ok(Some(Some(task))) => TaskActionResponse::success("Task toggled.", Some(&task)),
        Ok(Some(None)) => TaskActionResponse::failure("task_toggle was rolled back"),
        Ok(None) => TaskActionResponse::failure(format!("task not found: {task_id}")),
        Err(err) => TaskActionResponse::failure(format!("task_toggle failed: {err}")),
    }
}

/// Deletes a task.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: String) -> TaskActionResponse {
    let deleted = parse_task_id(&task_id).and_then(|id| {
        with_store(|store| store.get_task(id).is_some().then(|| store.delete_task(id)))
    });
    match deleted {
        Ok(Some(true)) => TaskActionResponse::success("Task deleted.", None),
        Ok(Some(false)) => TaskActionResponse::failure("task_delete was rolled back"),
        Ok(None) => TaskActionResponse::failure(format!("task not found: {task_id}")),
        Err(err) => TaskActionResponse::failure(format!("task_delete failed: {err}")),
    }
}

/// Deletes every completed task.
#[flutter_rust_bridge::frb(sync)]
pub fn task_clear_completed() -> TaskActionResponse {
    let result = with_store(|store| {
        let completed = store.count(TaskFilter::Completed);
        (completed, store.clear_completed_tasks())
    });
    match result {
        Ok((completed, cleared)) if cleared == completed => {
            TaskActionResponse::success(format!("Cleared {cleared} task(s)."), None)
        }
        Ok(_) => TaskActionResponse::failure("task_clear_completed was rolled back"),
        Err(err) => TaskActionResponse::failure(format!("task_clear_completed failed: {err}")),
    }
}

/// Localized chrome strings for the list screen.
#[flutter_rust_bridge::frb(sync)]
pub fn screen_strings() -> ScreenStrings {
    let resolve = |string: DisplayString<'_>| string.resolve(&EnglishStrings);
    ScreenStrings {
        task_list: resolve(DisplayString::TaskList),
        create_task_field: resolve(DisplayString::CreateTaskField),
        task_placeholder: resolve(DisplayString::TaskPlaceholder),
        clear_completed: resolve(DisplayString::ClearCompletedButton),
        filter_all: resolve(DisplayString::FilterTitle(TaskFilter::All)),
        filter_active: resolve(DisplayString::FilterTitle(TaskFilter::Active)),
        filter_completed: resolve(DisplayString::FilterTitle(TaskFilter::Completed)),
    }
}

fn list_snapshot(
    store: &TaskStore<SqliteTaskRepository<'_>>,
    filter: TaskFilter,
) -> (Vec<TaskItem>, u32) {
    let items = store
        .task_list(filter)
        .iter()
        .map(to_task_item)
        .collect::<Vec<_>>();
    let active_count = u32::try_from(store.count(TaskFilter::Active)).unwrap_or(u32::MAX);
    (items, active_count)
}

fn items_left_text(active_count: u32) -> String {
    let count = usize::try_from(active_count).unwrap_or(usize::MAX);
    DisplayString::ItemsLeft(count).resolve(&EnglishStrings)
}

fn parse_task_id(value: &str) -> Result<TaskId, String> {
    value
        .trim()
        .parse::<TaskId>()
        .map_err(|_| format!("invalid task id `{value}`"))
}

fn resolve_task_db_path() -> PathBuf {
    if let Some(path) = db_path_override() {
        return path;
    }
    TASK_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("TODO_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(TASK_DB_FILE_NAME)
        })
        .clone()
}

#[cfg(not(test))]
fn db_path_override() -> Option<PathBuf> {
    None
}

#[cfg(test)]
fn db_path_override() -> Option<PathBuf> {
    tests::TEST_DB_PATH.with(|path| path.borrow().clone())
}

fn with_store<T>(
    f: impl FnOnce(&mut TaskStore<SqliteTaskRepository<'_>>) -> T,
) -> Result<T, String> {
    let db_path = resolve_task_db_path();
    let conn = open_db(&db_path).map_err(|err| {
        warn!(
            "event=ffi_store module=ffi status=error error_code={} error={err}",
            err.code()
        );
        format!("task DB open failed: {err}")
    })?;
    let repo = SqliteTaskRepository::try_new(&conn)
        .map_err(|err| format!("task repo init failed: {err}"))?;
    let mut store = TaskStore::with_config(
        repo,
        StoreConfig {
            persist_policy: PersistPolicy::Strict,
        },
    );
    Ok(f(&mut store))
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        task_id: task.id.to_string(),
        label: task.label.clone(),
        completed: task.completed,
        created_at: task.created_at,
    }
}
