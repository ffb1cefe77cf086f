//! Task list presenter and its render contract.

use crate::model::filter::TaskFilter;
use crate::model::task::TaskId;
use crate::repo::task_repo::TaskRepository;
use crate::service::observer::{ObserverId, TaskChange, TaskObserver, TaskView};
use crate::service::task_store::{TaskStore, UpdateOutcome};
use crate::strings::{DisplayString, EnglishStrings, Localizer};
use log::{debug, warn};
use std::cell::RefCell;
use std::rc::Rc;

/// One rendered list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub label: String,
    pub completed: bool,
    /// Accessibility label of the row's completion toggle.
    pub toggle_accessibility_label: String,
}

/// Everything the screen shows for one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListScreen {
    pub filter: TaskFilter,
    /// Rows passing `filter`, in creation order.
    pub rows: Vec<TaskRow>,
    /// Active tasks across the whole store, regardless of `filter`.
    pub active_count: usize,
    /// Localized footer, e.g. `2 items left`.
    pub items_left: String,
}

impl TaskListScreen {
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.label.as_str()).collect()
    }
}

/// Static, localized chrome of the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLabels {
    pub task_list: String,
    pub create_task_field: String,
    pub task_placeholder: String,
    pub clear_completed: String,
    /// Segment titles indexed by `TaskFilter::segment()`.
    pub filter_titles: [String; 3],
}

/// Render target supplied by the UI shell.
pub trait TaskListView {
    fn render(&mut self, screen: &TaskListScreen);
}

struct ScreenState {
    filter: TaskFilter,
    view: Box<dyn TaskListView>,
    localizer: Rc<dyn Localizer>,
    last: Option<TaskListScreen>,
}

impl ScreenState {
    fn render(&mut self, tasks: TaskView<'_>) {
        let localizer = self.localizer.as_ref();
        let rows = tasks
            .iter(self.filter)
            .map(|task| TaskRow {
                id: task.id,
                label: task.label.clone(),
                completed: task.completed,
                toggle_accessibility_label: DisplayString::MarkAsCompletedButton(&task.label)
                    .resolve(localizer),
            })
            .collect();
        let active_count = tasks.count(TaskFilter::Active);
        let screen = TaskListScreen {
            filter: self.filter,
            rows,
            active_count,
            items_left: DisplayString::ItemsLeft(active_count).resolve(localizer),
        };

        self.view.render(&screen);
        self.last = Some(screen);
    }
}

struct RenderOnChange {
    state: Rc<RefCell<ScreenState>>,
}

impl TaskObserver for RenderOnChange {
    fn tasks_changed(&mut self, change: &TaskChange, tasks: TaskView<'_>) {
        debug!(
            "event=presenter_render module=presenter status=start trigger={}",
            change_name(change)
        );
        self.state.borrow_mut().render(tasks);
    }
}

/// Presenter for the single task list screen.
///
/// Holds the current filter (initially `All`), re-renders on every store
/// change and deregisters from the store when dropped.
pub struct TaskListPresenter<R: TaskRepository> {
    store: Rc<RefCell<TaskStore<R>>>,
    state: Rc<RefCell<ScreenState>>,
    observer: ObserverId,
}

impl<R: TaskRepository> TaskListPresenter<R> {
    /// Attaches a presenter with English strings and renders once.
    pub fn new(store: Rc<RefCell<TaskStore<R>>>, view: impl TaskListView + 'static) -> Self {
        Self::with_localizer(store, view, Rc::new(EnglishStrings))
    }

    /// Attaches a presenter using `localizer` and renders once.
    pub fn with_localizer(
        store: Rc<RefCell<TaskStore<R>>>,
        view: impl TaskListView + 'static,
        localizer: Rc<dyn Localizer>,
    ) -> Self {
        let state = Rc::new(RefCell::new(ScreenState {
            filter: TaskFilter::All,
            view: Box::new(view),
            localizer,
            last: None,
        }));
        let observer = store.borrow_mut().subscribe(RenderOnChange {
            state: Rc::clone(&state),
        });

        let presenter = Self {
            store,
            state,
            observer,
        };
        presenter.refresh();
        presenter
    }

    pub fn filter(&self) -> TaskFilter {
        self.state.borrow().filter
    }

    /// Last rendered screen.
    pub fn screen(&self) -> Option<TaskListScreen> {
        self.state.borrow().last.clone()
    }

    pub fn labels(&self) -> ScreenLabels {
        let state = self.state.borrow();
        let localizer = state.localizer.as_ref();
        ScreenLabels {
            task_list: DisplayString::TaskList.resolve(localizer),
            create_task_field: DisplayString::CreateTaskField.resolve(localizer),
            task_placeholder: DisplayString::TaskPlaceholder.resolve(localizer),
            clear_completed: DisplayString::ClearCompletedButton.resolve(localizer),
            filter_titles: TaskFilter::ALL
                .map(|filter| DisplayString::FilterTitle(filter).resolve(localizer)),
        }
    }

    /// Text field confirmation. Empty input is ignored; everything else is
    /// handed to the store as typed.
    ///
    /// Gestures return whether the store kept a change, so a shell can
    /// surface writes that were rolled back.
    pub fn submit(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.store.borrow_mut().create_task(text).is_some()
    }

    pub fn toggle(&self, id: TaskId) -> bool {
        self.store.borrow_mut().toggle_task(id).is_some()
    }

    /// Inline edit confirmation for one row.
    pub fn edit(&self, id: TaskId, text: &str) -> bool {
        matches!(
            self.store.borrow_mut().update_task(id, text),
            UpdateOutcome::Updated(_) | UpdateOutcome::Deleted
        )
    }

    /// Swipe-to-delete for one row.
    pub fn delete(&self, id: TaskId) -> bool {
        self.store.borrow_mut().delete_task(id)
    }

    /// Returns the number of tasks removed.
    pub fn clear_completed(&self) -> usize {
        self.store.borrow_mut().clear_completed_tasks()
    }

    pub fn select_filter(&self, filter: TaskFilter) {
        self.state.borrow_mut().filter = filter;
        self.refresh();
    }

    /// Segmented control selection; unknown segments select `All`.
    pub fn select_segment(&self, index: usize) {
        self.select_filter(TaskFilter::from_segment(index));
    }

    /// Re-runs the current query and renders it.
    pub fn refresh(&self) {
        let store = self.store.borrow();
        self.state.borrow_mut().render(store.view());
    }
}

impl<R: TaskRepository> Drop for TaskListPresenter<R> {
    fn drop(&mut self) {
        match self.store.try_borrow_mut() {
            Ok(mut store) => {
                store.unsubscribe(self.observer);
            }
            Err(_) => warn!(
                "event=presenter_teardown module=presenter status=error error_code=store_busy"
            ),
        }
    }
}

fn change_name(change: &TaskChange) -> &'static str {
    match change {
        TaskChange::Created(_) => "created",
        TaskChange::Updated(_) => "updated",
        TaskChange::Toggled(_) => "toggled",
        TaskChange::Deleted(_) => "deleted",
        TaskChange::ClearedCompleted(_) => "cleared_completed",
        TaskChange::Reloaded => "reloaded",
    }
}
