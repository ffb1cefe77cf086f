//! UI-facing presentation of the task list.
//!
//! # Responsibility
//! - Translate user gestures into `TaskStore` calls.
//! - Re-render the filtered list whenever the filter or the store changes.
//!
//! # Invariants
//! - The presenter never validates content; trimming belongs to the store.
//! - Exactly one store observer is registered per live presenter.

pub mod task_list;
