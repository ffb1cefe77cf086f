use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use todo_core::db::{open_db, open_db_in_memory};
use todo_core::{
    PersistPolicy, RepoError, RepoResult, SqliteTaskRepository, StoreConfig, Task, TaskChange,
    TaskFilter, TaskId, TaskRepository, TaskStore, TaskView, UpdateOutcome,
};

fn labels(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.label.as_str()).collect()
}

fn ids(tasks: &[Task]) -> Vec<TaskId> {
    tasks.iter().map(|task| task.id).collect()
}

#[test]
fn whitespace_content_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());

    for content in ["", " ", "\t", "  \n  ", "\r\n"] {
        assert!(store.create_task(content).is_none(), "{content:?}");
    }
    assert_eq!(store.count(TaskFilter::All), 0);
    assert!(store
        .repository()
        .list_tasks(TaskFilter::All)
        .unwrap()
        .is_empty());
}

#[test]
fn create_trims_and_adds_exactly_one_open_task() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let task = store.create_task("  Buy milk  ").unwrap();
    assert_eq!(task.label, "Buy milk");
    assert!(!task.completed);
    assert_eq!(store.count(TaskFilter::All), 1);

    let persisted = store.repository().get_task(task.id).unwrap().unwrap();
    assert_eq!(persisted, task);
}

#[test]
fn update_with_blank_content_deletes_task() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let keep = store.create_task("keep").unwrap();
    let drop_me = store.create_task("drop").unwrap();

    assert_eq!(store.update_task(drop_me.id, "   "), UpdateOutcome::Deleted);

    assert_eq!(ids(&store.task_list(TaskFilter::All)), vec![keep.id]);
    assert!(store.repository().get_task(drop_me.id).unwrap().is_none());
}

#[test]
fn update_replaces_trimmed_label_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let task = store.create_task("draft").unwrap();

    let outcome = store.update_task(task.id, "  final  ");
    let UpdateOutcome::Updated(updated) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(updated.label, "final");
    assert_eq!(updated.created_at, task.created_at);

    let persisted = store.repository().get_task(task.id).unwrap().unwrap();
    assert_eq!(persisted.label, "final");
}

#[test]
fn toggle_moves_task_between_partitions_and_back() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let task = store.create_task("flip me").unwrap();

    let toggled = store.toggle_task(task.id).unwrap();
    assert!(toggled.completed);
    assert!(store.task_list(TaskFilter::Active).is_empty());
    assert_eq!(ids(&store.task_list(TaskFilter::Completed)), vec![task.id]);
    assert!(store.repository().get_task(task.id).unwrap().unwrap().completed);

    store.toggle_task(task.id).unwrap();
    assert_eq!(ids(&store.task_list(TaskFilter::Active)), vec![task.id]);
    assert!(store.task_list(TaskFilter::Completed).is_empty());
}

#[test]
fn all_is_disjoint_union_of_active_and_completed() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let created: Vec<Task> = (0..6)
        .map(|index| store.create_task(&format!("task {index}")).unwrap())
        .collect();
    for task in created.iter().step_by(2) {
        store.toggle_task(task.id);
    }

    let all: HashSet<TaskId> = ids(&store.task_list(TaskFilter::All)).into_iter().collect();
    let active = ids(&store.task_list(TaskFilter::Active));
    let completed = ids(&store.task_list(TaskFilter::Completed));

    assert_eq!(all.len(), 6);
    assert_eq!(active.len() + completed.len(), all.len());
    let union: HashSet<TaskId> = active.iter().chain(completed.iter()).copied().collect();
    assert_eq!(union, all);
}

#[test]
fn clear_completed_empties_completed_and_keeps_active() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let a = store.create_task("a").unwrap();
    let b = store.create_task("b").unwrap();
    let c = store.create_task("c").unwrap();
    store.toggle_task(a.id);
    store.toggle_task(c.id);
    let active_before = store.task_list(TaskFilter::Active);

    assert_eq!(store.clear_completed_tasks(), 2);

    assert!(store.task_list(TaskFilter::Completed).is_empty());
    assert_eq!(store.task_list(TaskFilter::Active), active_before);
    assert_eq!(
        ids(&store.repository().list_tasks(TaskFilter::All).unwrap()),
        vec![b.id]
    );
    assert_eq!(store.clear_completed_tasks(), 0);
}

#[test]
fn creation_order_is_preserved_under_every_filter() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    // Created back-to-back, so most share a wall-clock millisecond.
    let created: Vec<Task> = (0..50)
        .map(|index| store.create_task(&format!("t{index}")).unwrap())
        .collect();
    for task in created.iter().filter(|task| task.label.ends_with('3')) {
        store.toggle_task(task.id);
    }

    for filter in TaskFilter::ALL {
        let listed = ids(&store.task_list(filter));
        let expected: Vec<TaskId> = created
            .iter()
            .map(|task| task.id)
            .filter(|id| listed.contains(id))
            .collect();
        assert_eq!(listed, expected, "filter {filter}");
    }

    let persisted = ids(&store.repository().list_tasks(TaskFilter::All).unwrap());
    assert_eq!(persisted, ids(&created));
}

#[test]
fn example_scenario() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());

    let milk = store.create_task("Buy milk").unwrap();
    assert!(store.create_task("  ").is_none());
    store.create_task("Walk dog").unwrap();

    let all = store.task_list(TaskFilter::All);
    assert_eq!(labels(&all), vec!["Buy milk", "Walk dog"]);
    assert!(all.iter().all(|task| !task.completed));

    store.toggle_task(milk.id);
    assert_eq!(labels(&store.task_list(TaskFilter::Active)), vec!["Walk dog"]);
    assert_eq!(labels(&store.task_list(TaskFilter::Completed)), vec!["Buy milk"]);

    store.clear_completed_tasks();
    assert_eq!(labels(&store.task_list(TaskFilter::All)), vec!["Walk dog"]);
}

#[test]
fn operations_on_missing_tasks_are_no_ops() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let task = store.create_task("once").unwrap();

    assert!(store.delete_task(task.id));
    assert!(!store.delete_task(task.id));
    assert!(store.toggle_task(task.id).is_none());
    assert_eq!(store.update_task(task.id, "again"), UpdateOutcome::Missing);
    assert_eq!(store.count(TaskFilter::All), 0);
}

#[test]
fn store_reloads_persisted_tasks_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("todo.sqlite3");

    let (first, second) = {
        let conn = open_db(&path).unwrap();
        let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
        let first = store.create_task("first").unwrap();
        let second = store.create_task("second").unwrap();
        store.toggle_task(second.id);
        (first, second)
    };

    let conn = open_db(&path).unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    assert_eq!(ids(&store.task_list(TaskFilter::All)), vec![first.id, second.id]);
    assert_eq!(ids(&store.task_list(TaskFilter::Completed)), vec![second.id]);

    let third = store.create_task("third").unwrap();
    assert!(third.created_at > second.created_at);
    assert_eq!(
        ids(&store.task_list(TaskFilter::All)),
        vec![first.id, second.id, third.id]
    );
}

#[test]
fn observers_are_notified_synchronously_after_mutations() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let seen: Rc<RefCell<Vec<(String, usize)>>> = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&seen);
    let observer = store.subscribe(move |change: &TaskChange, tasks: TaskView<'_>| {
        let name = match change {
            TaskChange::Created(_) => "created",
            TaskChange::Updated(_) => "updated",
            TaskChange::Toggled(_) => "toggled",
            TaskChange::Deleted(_) => "deleted",
            TaskChange::ClearedCompleted(_) => "cleared",
            TaskChange::Reloaded => "reloaded",
        };
        sink.borrow_mut().push((name.to_string(), tasks.len()));
    });

    assert!(store.create_task(" ").is_none());
    let task = store.create_task("watch").unwrap();
    assert_eq!(seen.borrow().len(), 1);
    store.update_task(task.id, "watched");
    store.toggle_task(task.id);
    store.clear_completed_tasks();
    store.clear_completed_tasks();

    assert_eq!(
        *seen.borrow(),
        vec![
            ("created".to_string(), 1),
            ("updated".to_string(), 1),
            ("toggled".to_string(), 1),
            ("cleared".to_string(), 0),
        ]
    );

    assert!(store.unsubscribe(observer));
    store.create_task("unseen");
    assert_eq!(seen.borrow().len(), 4);
}

struct FlakyRepository<'conn> {
    inner: SqliteTaskRepository<'conn>,
    failing: Rc<Cell<bool>>,
}

impl FlakyRepository<'_> {
    fn check(&self) -> RepoResult<()> {
        if self.failing.get() {
            return Err(RepoError::InvalidData("injected failure".to_string()));
        }
        Ok(())
    }
}

impl TaskRepository for FlakyRepository<'_> {
    fn insert_task(&self, task: &Task) -> RepoResult<()> {
        self.check()?;
        self.inner.insert_task(task)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        self.check()?;
        self.inner.update_task(task)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.check()?;
        self.inner.delete_task(id)
    }

    fn delete_tasks(&self, ids: &[TaskId]) -> RepoResult<usize> {
        self.check()?;
        self.inner.delete_tasks(ids)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.check()?;
        self.inner.get_task(id)
    }

    fn list_tasks(&self, filter: TaskFilter) -> RepoResult<Vec<Task>> {
        self.check()?;
        self.inner.list_tasks(filter)
    }
}

fn flaky_store(
    conn: &rusqlite::Connection,
    policy: PersistPolicy,
) -> (TaskStore<FlakyRepository<'_>>, Rc<Cell<bool>>) {
    let failing = Rc::new(Cell::new(false));
    let repo = FlakyRepository {
        inner: SqliteTaskRepository::try_new(conn).unwrap(),
        failing: Rc::clone(&failing),
    };
    let store = TaskStore::with_config(
        repo,
        StoreConfig {
            persist_policy: policy,
        },
    );
    (store, failing)
}

#[test]
fn best_effort_keeps_in_memory_change_when_persist_fails() {
    let conn = open_db_in_memory().unwrap();
    let (mut store, failing) = flaky_store(&conn, PersistPolicy::BestEffort);
    let saved = store.create_task("saved").unwrap();

    failing.set(true);
    let unsaved = store.create_task("unsaved").unwrap();
    store.toggle_task(saved.id).unwrap();
    assert_eq!(ids(&store.task_list(TaskFilter::All)), vec![saved.id, unsaved.id]);
    assert_eq!(ids(&store.task_list(TaskFilter::Completed)), vec![saved.id]);

    failing.set(false);
    let on_disk = store.repository().list_tasks(TaskFilter::All).unwrap();
    assert_eq!(ids(&on_disk), vec![saved.id]);
    assert!(!on_disk[0].completed);
}

#[test]
fn strict_policy_rolls_back_failed_mutations() {
    let conn = open_db_in_memory().unwrap();
    let (mut store, failing) = flaky_store(&conn, PersistPolicy::Strict);
    let notified = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notified);
    store.subscribe(move |_: &TaskChange, _: TaskView<'_>| counter.set(counter.get() + 1));

    let task = store.create_task("stable").unwrap();
    store.toggle_task(task.id).unwrap();
    assert_eq!(notified.get(), 2);

    failing.set(true);
    assert!(store.create_task("lost").is_none());
    assert!(store.toggle_task(task.id).is_none());
    assert_eq!(store.update_task(task.id, "renamed"), UpdateOutcome::RolledBack);
    assert_eq!(store.update_task(task.id, ""), UpdateOutcome::RolledBack);
    assert!(!store.delete_task(task.id));
    assert_eq!(store.clear_completed_tasks(), 0);

    assert_eq!(notified.get(), 2);
    assert_eq!(store.task_list(TaskFilter::All), vec![Task {
        label: "stable".to_string(),
        completed: true,
        ..task
    }]);
}

#[test]
fn fetch_failure_yields_empty_working_set() {
    let conn = open_db_in_memory().unwrap();
    {
        let mut seed = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
        seed.create_task("persisted");
    }

    let (mut store, failing) = flaky_store(&conn, PersistPolicy::BestEffort);
    assert_eq!(store.count(TaskFilter::All), 1);

    failing.set(true);
    store.reload();
    assert!(store.task_list(TaskFilter::All).is_empty());

    failing.set(false);
    store.reload();
    assert_eq!(labels(&store.task_list(TaskFilter::All)), vec!["persisted"]);
}
