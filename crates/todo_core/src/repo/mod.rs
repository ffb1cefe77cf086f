//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable data access contract behind the task store.
//! - Isolate SQLite query details from store/presenter orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Task::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_repo;
