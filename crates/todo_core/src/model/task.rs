//! Task domain model.
//!
//! # Responsibility
//! - Define the single entity of the to-do list.
//! - Own the label normalization rule shared by create and update paths.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `label` is trimmed and non-empty.
//! - `id` and `created_at` never change after construction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one task.
pub type TaskId = Uuid;

/// Validation error for task construction and persisted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Label is empty after trimming.
    EmptyLabel,
    /// Label carries leading or trailing whitespace.
    UntrimmedLabel,
    /// Creation timestamp is before the Unix epoch.
    NegativeCreatedAt(i64),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "label must not be empty"),
            Self::UntrimmedLabel => write!(f, "label must be trimmed"),
            Self::NegativeCreatedAt(value) => {
                write!(f, "created_at must be >= 0, got {value}")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// One to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable ID assigned at creation.
    pub id: TaskId,
    /// Trimmed, non-empty text content.
    pub label: String,
    /// Completion flag, `false` at creation.
    pub completed: bool,
    /// Unix epoch milliseconds, assigned at creation.
    pub created_at: i64,
}

impl Task {
    /// Creates a new open task with a generated ID.
    ///
    /// Returns `None` when `content` trims to empty.
    pub fn new(content: &str, created_at: i64) -> Option<Self> {
        Self::with_id(Uuid::new_v4(), content, created_at).ok()
    }

    /// Creates a task with a caller-provided ID.
    ///
    /// Used by load paths where identity already exists in storage.
    ///
    /// # Errors
    /// - `EmptyLabel` when `content` trims to empty.
    /// - `NegativeCreatedAt` when `created_at < 0`.
    pub fn with_id(
        id: TaskId,
        content: &str,
        created_at: i64,
    ) -> Result<Self, TaskValidationError> {
        let label = normalize_label(content).ok_or(TaskValidationError::EmptyLabel)?;
        let task = Self {
            id,
            label,
            completed: false,
            created_at,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks record invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.label.trim().is_empty() {
            return Err(TaskValidationError::EmptyLabel);
        }
        if self.label.trim() != self.label {
            return Err(TaskValidationError::UntrimmedLabel);
        }
        if self.created_at < 0 {
            return Err(TaskValidationError::NegativeCreatedAt(self.created_at));
        }
        Ok(())
    }

    /// Stable list ordering: creation time, then id.
    pub fn list_order(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Trims `content`; returns `None` when nothing is left.
pub fn normalize_label(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
