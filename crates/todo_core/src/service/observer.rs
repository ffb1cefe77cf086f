//! Change notification contract between the store and its observers.
//!
//! # Invariants
//! - Observers run synchronously on the mutating thread, in registration order.
//! - Observers only see a read-only view; they cannot re-enter the store.

use crate::model::filter::TaskFilter;
use crate::model::task::{Task, TaskId};

/// Handle returned by `TaskStore::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// What changed in the task collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskChange {
    Created(Task),
    Updated(Task),
    Toggled(Task),
    Deleted(TaskId),
    ClearedCompleted(Vec<TaskId>),
    /// Working set was re-fetched from storage.
    Reloaded,
}

/// Read-only, ordered view over the store's working set.
#[derive(Debug, Clone, Copy)]
pub struct TaskView<'a> {
    tasks: &'a [Task],
}

impl<'a> TaskView<'a> {
    pub(crate) fn new(tasks: &'a [Task]) -> Self {
        Self { tasks }
    }

    /// Tasks passing `filter`, in stable creation order.
    pub fn list(&self, filter: TaskFilter) -> Vec<Task> {
        self.iter(filter).cloned().collect()
    }

    /// Borrowing variant of `list`.
    pub fn iter(&self, filter: TaskFilter) -> impl Iterator<Item = &'a Task> + 'a {
        let tasks: &'a [Task] = self.tasks;
        tasks.iter().filter(move |task| filter.matches(task))
    }

    pub fn count(&self, filter: TaskFilter) -> usize {
        self.iter(filter).count()
    }

    pub fn get(&self, id: TaskId) -> Option<&'a Task> {
        let tasks: &'a [Task] = self.tasks;
        tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Receives store change notifications.
pub trait TaskObserver {
    fn tasks_changed(&mut self, change: &TaskChange, tasks: TaskView<'_>);
}

impl<F> TaskObserver for F
where
    F: FnMut(&TaskChange, TaskView<'_>),
{
    fn tasks_changed(&mut self, change: &TaskChange, tasks: TaskView<'_>) {
        self(change, tasks)
    }
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn TaskObserver>)>,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, observer: Box<dyn TaskObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn notify(&mut self, change: &TaskChange, tasks: TaskView<'_>) {
        for (_, observer) in &mut self.entries {
            observer.tasks_changed(change, tasks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ObserverRegistry, TaskChange, TaskView};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn registry_notifies_in_order_and_removes() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ObserverRegistry::default();

        let first_calls = Rc::clone(&calls);
        let first = registry.register(Box::new(move |_: &TaskChange, _: TaskView<'_>| {
            first_calls.borrow_mut().push("first");
        }));
        let second_calls = Rc::clone(&calls);
        registry.register(Box::new(move |_: &TaskChange, _: TaskView<'_>| {
            second_calls.borrow_mut().push("second");
        }));

        registry.notify(&TaskChange::Reloaded, TaskView::new(&[]));
        assert_eq!(*calls.borrow(), vec!["first", "second"]);

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert_eq!(registry.len(), 1);
    }
}
