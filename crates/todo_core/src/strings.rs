//! Display strings for the task list screen.
//!
//! UI shells look strings up by symbolic key through a `Localizer`; a missing
//! key resolves to the key itself so gaps stay visible instead of blank.

use crate::model::filter::TaskFilter;
use std::collections::HashMap;

const ARG_PLACEHOLDER: &str = "{}";

/// String lookup service keyed by symbolic identifiers.
pub trait Localizer {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Built-in English table.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishStrings;

impl Localizer for EnglishStrings {
    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            "accessibility.todo_list.tasks_list" => "Tasks list",
            "accessibility.todo_list.create_new_task_textfield" => "Create a new task",
            "accessibility.todo_list.mark_as_completed_button" => "Mark {} as completed",
            "accessibility.todo_list.clear_completed_tasks" => "Clear completed tasks",
            "todo_list.task_placeholder" => "What needs to be done?",
            "todo_list.filter.all" => "All",
            "todo_list.filter.active" => "Active",
            "todo_list.filter.completed" => "Completed",
            "todo_list.item_left" => " item left",
            "todo_list.items_left" => " items left",
            _ => return None,
        };
        Some(value.to_string())
    }
}

/// Key/value table, e.g. loaded from a translation file.
///
/// Keys absent from the table fall through to `fallback`.
pub struct TableLocalizer<F: Localizer = EnglishStrings> {
    entries: HashMap<String, String>,
    fallback: F,
}

impl TableLocalizer {
    /// Parses a flat JSON object of `key -> string`.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(source)?,
            fallback: EnglishStrings,
        })
    }
}

impl<F: Localizer> TableLocalizer<F> {
    pub fn with_fallback(entries: HashMap<String, String>, fallback: F) -> Self {
        Self { entries, fallback }
    }
}

impl<F: Localizer> Localizer for TableLocalizer<F> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .cloned()
            .or_else(|| self.fallback.lookup(key))
    }
}

/// Every string the task list screen displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayString<'a> {
    TaskList,
    CreateTaskField,
    /// Toggle button of one row; carries the task label.
    MarkAsCompletedButton(&'a str),
    ClearCompletedButton,
    TaskPlaceholder,
    FilterTitle(TaskFilter),
    /// Footer counter of active tasks.
    ItemsLeft(usize),
}

impl DisplayString<'_> {
    pub fn key(&self) -> &'static str {
        match self {
            Self::TaskList => "accessibility.todo_list.tasks_list",
            Self::CreateTaskField => "accessibility.todo_list.create_new_task_textfield",
            Self::MarkAsCompletedButton(_) => "accessibility.todo_list.mark_as_completed_button",
            Self::ClearCompletedButton => "accessibility.todo_list.clear_completed_tasks",
            Self::TaskPlaceholder => "todo_list.task_placeholder",
            Self::FilterTitle(TaskFilter::All) => "todo_list.filter.all",
            Self::FilterTitle(TaskFilter::Active) => "todo_list.filter.active",
            Self::FilterTitle(TaskFilter::Completed) => "todo_list.filter.completed",
            Self::ItemsLeft(1) => "todo_list.item_left",
            Self::ItemsLeft(_) => "todo_list.items_left",
        }
    }

    /// Looks the string up and applies its argument, if any.
    pub fn resolve(&self, localizer: &dyn Localizer) -> String {
        let key = self.key();
        let template = localizer.lookup(key).unwrap_or_else(|| key.to_string());
        match self {
            Self::MarkAsCompletedButton(label) => template.replacen(ARG_PLACEHOLDER, label, 1),
            Self::ItemsLeft(count) => format!("{count}{template}"),
            _ => template,
        }
    }
}
