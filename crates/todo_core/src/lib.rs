//! Core domain logic for the to-do list.
//! This crate is the single source of truth for task invariants.

pub mod db;
pub mod logging;
pub mod mirror;
pub mod model;
pub mod presenter;
pub mod repo;
pub mod service;
pub mod strings;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use mirror::{
    ConfigError, HttpMirrorTransport, InFlight, MirrorConfig, MirrorError, MirrorPayload,
    MirrorTransport, TaskMirror,
};
pub use model::filter::TaskFilter;
pub use model::task::{Task, TaskId, TaskValidationError};
pub use presenter::task_list::{
    ScreenLabels, TaskListPresenter, TaskListScreen, TaskListView, TaskRow,
};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::observer::{ObserverId, TaskChange, TaskObserver, TaskView};
pub use service::task_store::{PersistPolicy, StoreConfig, TaskStore, UpdateOutcome};
pub use strings::{DisplayString, EnglishStrings, Localizer, TableLocalizer};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
