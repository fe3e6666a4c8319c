use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub const MIN_TITLE_LEN: usize = 3;
pub const DEFAULT_PAGE_SIZE: usize = 10;

// Todo struct
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

// Server echo of an update; fields the request left out may be missing
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Overlays the fields present in the patch on `base`. The id never changes.
    pub fn apply_to(&self, base: &Todo) -> Todo {
        Todo {
            id: base.id,
            user_id: self.user_id.unwrap_or(base.user_id),
            title: self.title.clone().unwrap_or_else(|| base.title.clone()),
            completed: self.completed.unwrap_or(base.completed),
        }
    }
}

// User struct, only the fields the dashboard reads are typed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    #[default]
    All,
    Completed,
    Pending,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 3] = [TodoStatus::All, TodoStatus::Completed, TodoStatus::Pending];

    pub fn value(self) -> &'static str {
        match self {
            TodoStatus::All => "all",
            TodoStatus::Completed => "completed",
            TodoStatus::Pending => "pending",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TodoStatus::All => "All Status",
            TodoStatus::Completed => "Completed",
            TodoStatus::Pending => "Pending",
        }
    }

    pub fn next(self) -> TodoStatus {
        match self {
            TodoStatus::All => TodoStatus::Completed,
            TodoStatus::Completed => TodoStatus::Pending,
            TodoStatus::Pending => TodoStatus::All,
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusOption {
    pub value: String,
    pub label: String,
}

/// Assignee and status criteria. `user_id: None` means any assignee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilter {
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub status: TodoStatus,
}

impl TodoFilter {
    pub fn new(user_id: Option<u64>, status: TodoStatus) -> Self {
        TodoFilter { user_id, status }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        crate::query::should_include(todo, self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        PageRequest { page, page_size }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPage {
    pub todos: Vec<Todo>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl TodoPage {
    pub fn max_id(&self) -> Option<u64> {
        self.todos.iter().map(|todo| todo.id).max()
    }

    pub fn position(&self, id: u64) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }

    /// Sets `total` and keeps `total_pages` consistent with it.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.total_pages = crate::query::total_pages(total, self.page_size);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoInput {
    pub title: String,
    pub user_id: u64,
    pub completed: bool,
}

impl CreateTodoInput {
    pub fn new(title: impl Into<String>, user_id: u64) -> Self {
        CreateTodoInput {
            title: title.into(),
            user_id,
            completed: false,
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Builds an input from raw form text, rejecting a non-numeric assignee.
    pub fn from_form(title: &str, user_id: &str, completed: bool) -> Result<Self> {
        let user_id = parse_user_id(user_id)?;
        Ok(CreateTodoInput::new(title.trim(), user_id).completed(completed))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodoInput {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn user_id(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Speculative result of applying this partial update to `base`.
    pub fn merge_onto(&self, base: &Todo) -> Todo {
        Todo {
            id: base.id,
            user_id: self.user_id.unwrap_or(base.user_id),
            title: self.title.clone().unwrap_or_else(|| base.title.clone()),
            completed: self.completed.unwrap_or(base.completed),
        }
    }
}

pub fn parse_user_id(raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| Error::Validation {
        field: "userId",
        message: format!("'{}' is not a valid user id", raw.trim()),
    })
}
