use crate::api::TodoSource;
use crate::error::{Error, Result};
use crate::models::{CreateTodoInput, Todo, TodoPatch, UpdateTodoInput, User};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory upstream used by router and coordinator tests.
#[derive(Default)]
pub struct FakeSource {
    todos: Mutex<Vec<Todo>>,
    users: Vec<User>,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        FakeSource {
            todos: Mutex::new(todos),
            ..Default::default()
        }
    }

    pub fn with_users(mut self, users: Vec<User>) -> Self {
        self.users = users;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn write_guard(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Upstream {
                status: 500,
                status_text: "Internal Server Error".to_string(),
            });
        }
        Ok(())
    }
}

pub fn user(id: u64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        username: name.to_lowercase(),
        email: format!("{}@example.com", name.to_lowercase()),
        profile: serde_json::Map::new(),
    }
}

pub fn todo(id: u64, user_id: u64, completed: bool) -> Todo {
    Todo {
        id,
        user_id,
        title: format!("task {}", id),
        completed,
    }
}

#[async_trait]
impl TodoSource for FakeSource {
    async fn fetch_todos(&self) -> Result<Vec<Todo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.todos.lock().clone())
    }

    async fn fetch_todo(&self, id: u64) -> Result<Todo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.todos
            .lock()
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
            .ok_or(Error::NotFound { id })
    }

    async fn create_todo(&self, input: &CreateTodoInput) -> Result<Todo> {
        self.write_guard()?;
        let mut todos = self.todos.lock();
        let id = todos.iter().map(|t| t.id).max().unwrap_or(200).max(200) + 1;
        let created = Todo {
            id,
            user_id: input.user_id,
            title: input.title.clone(),
            completed: input.completed,
        };
        todos.push(created.clone());
        Ok(created)
    }

    async fn update_todo(&self, id: u64, input: &UpdateTodoInput) -> Result<TodoPatch> {
        self.write_guard()?;
        let mut todos = self.todos.lock();
        let existing = todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(Error::NotFound { id })?;
        *existing = input.merge_onto(existing);
        Ok(TodoPatch {
            id: Some(id),
            user_id: input.user_id,
            title: input.title.clone(),
            completed: input.completed,
        })
    }

    async fn delete_todo(&self, id: u64) -> Result<()> {
        self.write_guard()?;
        self.todos.lock().retain(|todo| todo.id != id);
        Ok(())
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.clone())
    }
}
