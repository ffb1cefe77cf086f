//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `tasks` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - List results are ordered by `created_at ASC, id ASC`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::filter::TaskFilter;
use crate::model::task::{Task, TaskId, TaskValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT id, label, completed, created_at FROM tasks";
const REQUIRED_COLUMNS: &[&str] = &["id", "label", "completed", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable storage contract used by `TaskStore`.
pub trait TaskRepository {
    /// Inserts a new task row.
    fn insert_task(&self, task: &Task) -> RepoResult<()>;
    /// Replaces label/completion of an existing row.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Hard-deletes one row; `NotFound` when absent.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Hard-deletes all given rows in one transaction; returns rows removed.
    fn delete_tasks(&self, ids: &[TaskId]) -> RepoResult<usize>;
    /// Gets one task by id.
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Lists tasks matching `filter` in stable creation order.
    fn list_tasks(&self, filter: TaskFilter) -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when schema version is not current.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   shape does not match.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        ensure_tasks_schema(conn)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        self.conn
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (id, label, completed, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                task.id.to_string(),
                task.label.as_str(),
                bool_to_int(task.completed),
                task.created_at,
            ],
        )?;
        Ok(())
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks SET label = ?1, completed = ?2 WHERE id = ?3;",
            params![
                task.label.as_str(),
                bool_to_int(task.completed),
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_tasks(&self, ids: &[TaskId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM tasks WHERE id = ?1;")?;
            for id in ids {
                removed += stmt.execute([id.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_task_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_tasks(&self, filter: TaskFilter) -> RepoResult<Vec<Task>> {
        let where_clause = match filter {
            TaskFilter::All => "",
            TaskFilter::Active => " WHERE completed = 0",
            TaskFilter::Completed => " WHERE completed = 1",
        };
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}{where_clause} ORDER BY created_at ASC, id ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

fn ensure_tasks_schema(conn: &Connection) -> RepoResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('tasks');")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable("tasks"));
    }
    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "tasks",
                column,
            });
        }
    }
    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in tasks.id"))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in tasks.completed"
            )));
        }
    };

    let task = Task {
        id,
        label: row.get("label")?,
        completed,
        created_at: row.get("created_at")?,
    };
    task.validate()?;
    Ok(task)
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
