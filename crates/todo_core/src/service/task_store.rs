//! Task store: the single source of truth for the to-do list.
//!
//! # Responsibility
//! - Apply create/update/toggle/delete/clear to the in-memory working set.
//! - Persist every mutation immediately through a `TaskRepository`.
//! - Notify registered observers synchronously after each change that stands.
//!
//! # Invariants
//! - The working set is always ordered by `created_at ASC, id ASC`.
//! - `created_at` values handed out by one store are strictly increasing.
//! - Content validation (trim, empty check) runs before any mutation.
//! - No storage error crosses this boundary; failures are logged and
//!   resolved according to `PersistPolicy`.

use crate::model::filter::TaskFilter;
use crate::model::task::{normalize_label, Task, TaskId};
use crate::repo::task_repo::{RepoError, TaskRepository};
use crate::service::observer::{ObserverId, ObserverRegistry, TaskChange, TaskObserver, TaskView};
use log::{debug, error, info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

/// What to do with an in-memory change whose persistence failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Log and keep the in-memory change.
    #[default]
    BestEffort,
    /// Log and roll the in-memory change back.
    Strict,
}

impl PersistPolicy {
    fn as_str(self) -> &'static str {
        match self {
            Self::BestEffort => "best_effort",
            Self::Strict => "strict",
        }
    }
}

/// Store construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub persist_policy: PersistPolicy,
}

/// Result of `TaskStore::update_task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Label replaced.
    Updated(Task),
    /// Content trimmed to empty, so the task was removed.
    Deleted,
    /// No task with that id.
    Missing,
    /// Persistence failed under `PersistPolicy::Strict`; nothing changed.
    RolledBack,
}

/// Ordered working set of tasks backed by durable storage.
pub struct TaskStore<R: TaskRepository> {
    repo: R,
    config: StoreConfig,
    tasks: Vec<Task>,
    last_created_at: i64,
    observers: ObserverRegistry,
}

impl<R: TaskRepository> TaskStore<R> {
    /// Creates a best-effort store and loads the persisted tasks.
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, StoreConfig::default())
    }

    /// Creates a store with explicit options and loads the persisted tasks.
    pub fn with_config(repo: R, config: StoreConfig) -> Self {
        let mut store = Self {
            repo,
            config,
            tasks: Vec::new(),
            last_created_at: -1,
            observers: ObserverRegistry::default(),
        };
        store.load();
        info!(
            "event=store_open module=store status=ok policy={} task_count={}",
            config.persist_policy.as_str(),
            store.tasks.len()
        );
        store
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Read-only view over the working set.
    pub fn view(&self) -> TaskView<'_> {
        TaskView::new(&self.tasks)
    }

    /// Returns tasks matching `filter`, ordered by creation time.
    pub fn task_list(&self, filter: TaskFilter) -> Vec<Task> {
        self.view().list(filter)
    }

    pub fn count(&self, filter: TaskFilter) -> usize {
        self.view().count(filter)
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Task> {
        self.view().get(id)
    }

    /// Registers an observer; it is invoked after every change that stands.
    pub fn subscribe(&mut self, observer: impl TaskObserver + 'static) -> ObserverId {
        let id = self.observers.register(Box::new(observer));
        debug!(
            "event=observer_subscribe module=store status=ok observer_count={}",
            self.observers.len()
        );
        id
    }

    /// Removes an observer. Returns `false` when it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Creates an open task from `content`.
    ///
    /// Returns `None` without mutating anything when `content` trims to
    /// empty, or when persistence fails under `PersistPolicy::Strict`.
    pub fn create_task(&mut self, content: &str) -> Option<Task> {
        let Some(label) = normalize_label(content) else {
            debug!("event=task_create module=store status=skipped reason=empty_content");
            return None;
        };

        let previous_created_at = self.last_created_at;
        let created_at = now_epoch_ms().max(previous_created_at.saturating_add(1));
        let task = Task::new(&label, created_at)?;
        self.last_created_at = created_at;
        self.tasks.push(task.clone());

        if let Err(err) = self.repo.insert_task(&task) {
            if self.rollback_after("task_create", Some(task.id), &err) {
                self.tasks.pop();
                self.last_created_at = previous_created_at;
                return None;
            }
        } else {
            info!(
                "event=task_create module=store status=ok task_id={}",
                task.id
            );
        }

        self.notify(TaskChange::Created(task.clone()));
        Some(task)
    }

    /// Replaces the label of task `id` with trimmed `content`.
    ///
    /// Content that trims to empty deletes the task instead.
    pub fn update_task(&mut self, id: TaskId, content: &str) -> UpdateOutcome {
        let Some(index) = self.position(id) else {
            warn!("event=task_update module=store status=missing task_id={id}");
            return UpdateOutcome::Missing;
        };

        let Some(label) = normalize_label(content) else {
            return if self.delete_task(id) {
                UpdateOutcome::Deleted
            } else {
                UpdateOutcome::RolledBack
            };
        };

        let previous = std::mem::replace(&mut self.tasks[index].label, label);
        let task = self.tasks[index].clone();

        if let Err(err) = self.repo.update_task(&task) {
            if self.rollback_after("task_update", Some(id), &err) {
                self.tasks[index].label = previous;
                return UpdateOutcome::RolledBack;
            }
        } else {
            info!("event=task_update module=store status=ok task_id={id}");
        }

        self.notify(TaskChange::Updated(task.clone()));
        UpdateOutcome::Updated(task)
    }

    /// Removes task `id`. Returns `false` when it was absent or the removal
    /// was rolled back.
    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let Some(index) = self.position(id) else {
            warn!("event=task_delete module=store status=missing task_id={id}");
            return false;
        };

        let removed = self.tasks.remove(index);
        if let Err(err) = self.repo.delete_task(id) {
            if self.rollback_after("task_delete", Some(id), &err) {
                self.tasks.insert(index, removed);
                return false;
            }
        } else {
            info!("event=task_delete module=store status=ok task_id={id}");
        }

        self.notify(TaskChange::Deleted(id));
        true
    }

    /// Flips the completion flag of task `id`.
    pub fn toggle_task(&mut self, id: TaskId) -> Option<Task> {
        let Some(index) = self.position(id) else {
            warn!("event=task_toggle module=store status=missing task_id={id}");
            return None;
        };

        self.tasks[index].completed = !self.tasks[index].completed;
        let task = self.tasks[index].clone();

        if let Err(err) = self.repo.update_task(&task) {
            if self.rollback_after("task_toggle", Some(id), &err) {
                self.tasks[index].completed = !task.completed;
                return None;
            }
        } else {
            info!(
                "event=task_toggle module=store status=ok task_id={id} completed={}",
                task.completed
            );
        }

        self.notify(TaskChange::Toggled(task.clone()));
        Some(task)
    }

    /// Deletes every completed task in one persisted batch.
    ///
    /// Returns the number of tasks removed from the working set.
    pub fn clear_completed_tasks(&mut self) -> usize {
        let (cleared, kept): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.completed);
        self.tasks = kept;

        if cleared.is_empty() {
            debug!("event=task_clear_completed module=store status=skipped reason=none_completed");
            return 0;
        }

        let ids: Vec<TaskId> = cleared.iter().map(|task| task.id).collect();
        match self.repo.delete_tasks(&ids) {
            Ok(removed) => info!(
                "event=task_clear_completed module=store status=ok cleared={} removed_rows={removed}",
                ids.len()
            ),
            Err(err) => {
                if self.rollback_after("task_clear_completed", None, &err) {
                    self.tasks.extend(cleared);
                    self.tasks.sort_by(Task::list_order);
                    return 0;
                }
            }
        }

        let count = ids.len();
        self.notify(TaskChange::ClearedCompleted(ids));
        count
    }

    /// Re-fetches the working set from storage and notifies observers.
    ///
    /// A fetch failure is logged and leaves the working set empty.
    pub fn reload(&mut self) {
        self.load();
        self.notify(TaskChange::Reloaded);
    }

    fn load(&mut self) {
        self.tasks = match self.repo.list_tasks(TaskFilter::All) {
            Ok(mut tasks) => {
                tasks.sort_by(Task::list_order);
                tasks
            }
            Err(err) => {
                error!(
                    "event=task_fetch module=store status=error error={}",
                    err
                );
                Vec::new()
            }
        };
        self.last_created_at = self
            .tasks
            .iter()
            .map(|task| task.created_at)
            .max()
            .unwrap_or(-1)
            .max(self.last_created_at);
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Logs a persistence failure; returns whether to undo the change.
    fn rollback_after(&self, event: &str, id: Option<TaskId>, err: &RepoError) -> bool {
        let rollback = self.config.persist_policy == PersistPolicy::Strict;
        let task_id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
        error!(
            "event={event} module=store status=persist_failed task_id={task_id} policy={} rolled_back={rollback} error={err}",
            self.config.persist_policy.as_str()
        );
        rollback
    }

    fn notify(&mut self, change: TaskChange) {
        self.observers.notify(&change, TaskView::new(&self.tasks));
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
