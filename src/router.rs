//! Typed procedures the dashboard calls instead of talking to the upstream
//! service directly. Inputs are validated here, before any request goes out.

use crate::api::TodoSource;
use crate::error::{Error, Result};
use crate::models::{
    CreateTodoInput, PageRequest, StatusOption, Todo, TodoFilter, TodoPage, TodoPatch, TodoStatus,
    UpdateTodoInput, User, MIN_TITLE_LEN,
};
use crate::query::paginate;
use std::sync::Arc;

pub struct AppRouter<S> {
    pub todo: TodoRouter<S>,
    pub user: UserRouter<S>,
}

/// Builds both routers over one shared upstream.
pub fn create_caller<S: TodoSource>(source: Arc<S>) -> AppRouter<S> {
    AppRouter {
        todo: TodoRouter {
            source: Arc::clone(&source),
        },
        user: UserRouter { source },
    }
}

pub struct TodoRouter<S> {
    source: Arc<S>,
}

impl<S> Clone for TodoRouter<S> {
    fn clone(&self) -> Self {
        TodoRouter {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: TodoSource> TodoRouter<S> {
    pub fn get_status_options(&self) -> Vec<StatusOption> {
        TodoStatus::ALL
            .iter()
            .map(|status| StatusOption {
                value: status.value().to_string(),
                label: status.label().to_string(),
            })
            .collect()
    }

    pub async fn get_all(
        &self,
        filter: Option<TodoFilter>,
        page: Option<PageRequest>,
    ) -> Result<TodoPage> {
        let filter = filter.unwrap_or_default();
        let page = page.unwrap_or_default();
        if page.page == 0 {
            return Err(Error::validation("page", "must be at least 1"));
        }
        if page.page_size == 0 {
            return Err(Error::validation("pageSize", "must be a positive integer"));
        }

        let todos = self.source.fetch_todos().await?;
        let result = paginate(&todos, &filter, page);
        tracing::debug!(
            user_id = ?filter.user_id,
            status = %filter.status,
            page = page.page,
            total = result.total,
            "todo.getAll"
        );
        Ok(result)
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Todo> {
        self.source.fetch_todo(id).await
    }

    pub async fn create(&self, input: &CreateTodoInput) -> Result<Todo> {
        validate_title(&input.title)?;
        self.source.create_todo(input).await
    }

    pub async fn update(&self, id: u64, input: &UpdateTodoInput) -> Result<TodoPatch> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        self.source.update_todo(id, input).await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.source.delete_todo(id).await
    }
}

pub struct UserRouter<S> {
    source: Arc<S>,
}

impl<S: TodoSource> UserRouter<S> {
    pub async fn get_all(&self) -> Result<Vec<User>> {
        self.source.fetch_users().await
    }
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(Error::validation(
            "title",
            format!("must be at least {} characters", MIN_TITLE_LEN),
        ));
    }
    Ok(())
}
