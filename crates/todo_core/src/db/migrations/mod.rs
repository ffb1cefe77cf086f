//! Task schema migrations.
//!
//! # Responsibility
//! - List the task-table schema steps in the order they were introduced.
//! - Bring a connection up to the newest step inside one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly 1.
//! - `PRAGMA user_version` always equals the last applied step.
//! - A database stamped with a newer version than this build knows is never
//!   touched.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// One schema step for the task store.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    /// Short label used in log events.
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "create_tasks",
    sql: include_str!("0001_init.sql"),
}];

/// Returns the schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Applies every step newer than the connection's `user_version`.
///
/// Returns how many steps ran; `0` when the schema was already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skipped version={from_version}");
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from_version} to_version={latest} steps={}",
        pending.len()
    );
    Ok(pending.len())
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}
