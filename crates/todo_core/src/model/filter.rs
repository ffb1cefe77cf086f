//! Fixed list filter predicates.

use crate::model::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the three list filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    /// Every task.
    #[default]
    All,
    /// Tasks with `completed == false`.
    Active,
    /// Tasks with `completed == true`.
    Completed,
}

impl TaskFilter {
    /// Every filter, in segment order.
    pub const ALL: [TaskFilter; 3] = [TaskFilter::All, TaskFilter::Active, TaskFilter::Completed];

    /// Returns whether `task` passes this filter.
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }

    /// Maps a segmented-control index to a filter.
    ///
    /// Unknown indices fall back to `All`.
    pub fn from_segment(index: usize) -> Self {
        match index {
            1 => Self::Active,
            2 => Self::Completed,
            _ => Self::All,
        }
    }

    pub fn segment(self) -> usize {
        match self {
            Self::All => 0,
            Self::Active => 1,
            Self::Completed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl Display for TaskFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!(
                "unsupported filter `{other}`; expected all|active|completed"
            )),
        }
    }
}
