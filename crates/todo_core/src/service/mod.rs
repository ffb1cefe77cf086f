//! Core use-case services.
//!
//! # Responsibility
//! - Own the task working set and its persistence lifecycle.
//! - Publish change notifications to UI-facing observers.

pub mod observer;
pub mod task_store;
