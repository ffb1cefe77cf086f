//! Domain model for the to-do list.
//!
//! # Responsibility
//! - Define the canonical `Task` record owned by the store.
//! - Define the fixed filter predicates used by every list query.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - A task label is never empty or whitespace-only.

pub mod filter;
pub mod task;
