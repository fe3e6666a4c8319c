use crate::api::TodoSource;
use crate::cache::{ListKey, QueryCache};
use crate::error::Result;
use crate::models::{CreateTodoInput, StatusOption, Todo, TodoPage, UpdateTodoInput};
use crate::mutation::{PendingCreate, PendingDelete, PendingUpdate};
use crate::router::{validate_title, TodoRouter};
use std::sync::Arc;

/// Cache-backed access to the todo procedures. Reads fill the cache, writes
/// patch it optimistically and then reconcile or roll back.
pub struct TodoClient<S> {
    todos: TodoRouter<S>,
    cache: QueryCache,
}

impl<S> Clone for TodoClient<S> {
    fn clone(&self) -> Self {
        TodoClient {
            todos: self.todos.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: TodoSource> TodoClient<S> {
    pub fn new(todos: TodoRouter<S>, cache: QueryCache) -> Self {
        TodoClient { todos, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn status_options(&self) -> Vec<StatusOption> {
        self.todos.get_status_options()
    }

    pub fn cached_list(&self, key: &ListKey) -> Option<Arc<TodoPage>> {
        self.cache.get_list(key)
    }

    pub async fn fetch_list(&self, key: ListKey) -> Result<Arc<TodoPage>> {
        let page = self.todos.get_all(Some(key.filter), Some(key.page)).await?;
        let page = Arc::new(page);
        self.cache.restore_list(key, Arc::clone(&page));
        Ok(page)
    }

    pub async fn fetch_detail(&self, id: u64) -> Result<Todo> {
        let todo = self.todos.get_by_id(id).await?;
        self.cache.set_detail(todo.clone());
        Ok(todo)
    }

    pub async fn create(&self, key: ListKey, input: CreateTodoInput) -> Result<Todo> {
        validate_title(&input.title)?;

        let pending = PendingCreate::begin(&self.cache, key, &input);
        tracing::debug!(temporary_id = pending.temporary_id(), "create dispatched");
        match self.todos.create(&input).await {
            Ok(created) => {
                pending.succeed(&self.cache, &created);
                self.cache.invalidate_lists_except(&key);
                tracing::info!(id = created.id, "task created");
                Ok(created)
            }
            Err(err) => {
                pending.fail(&self.cache);
                tracing::warn!(error = %err, "create failed");
                Err(err)
            }
        }
    }

    pub async fn update(&self, key: ListKey, current: &Todo, input: UpdateTodoInput) -> Result<Todo> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }

        let pending = PendingUpdate::begin(&self.cache, key, current, &input);
        match self.todos.update(current.id, &input).await {
            Ok(echo) => {
                let updated = pending.succeed(&self.cache, &echo);
                self.cache.invalidate_lists_except(&key);
                tracing::info!(id = updated.id, "task updated");
                Ok(updated)
            }
            Err(err) => {
                pending.fail(&self.cache);
                tracing::warn!(id = current.id, error = %err, "update failed");
                Err(err)
            }
        }
    }

    pub async fn delete(&self, key: ListKey, id: u64) -> Result<()> {
        let pending = PendingDelete::begin(&self.cache, key, id);
        match self.todos.delete(id).await {
            Ok(()) => {
                pending.succeed(&self.cache);
                self.cache.invalidate_lists_except(&key);
                tracing::info!(id, "task deleted");
                Ok(())
            }
            Err(err) => {
                pending.fail(&self.cache);
                tracing::warn!(id, error = %err, "delete failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{PageRequest, TodoFilter, TodoStatus};
    use crate::router::create_caller;
    use crate::testing::{todo, FakeSource};

    fn client(todos: Vec<Todo>) -> (Arc<FakeSource>, TodoClient<FakeSource>) {
        let source = Arc::new(FakeSource::with_todos(todos));
        let router = create_caller(Arc::clone(&source));
        (source, TodoClient::new(router.todo, QueryCache::new()))
    }

    #[tokio::test]
    async fn test_fetch_list_fills_cache() {
        let (_, client) = client(vec![todo(1, 1, false), todo(2, 1, true)]);
        let key = ListKey::default();
        let page = client.fetch_list(key).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(client.cached_list(&key), Some(page));
    }

    #[tokio::test]
    async fn test_create_reconciles_with_server_id() {
        let (_, client) = client(vec![]);
        let key = ListKey::default();
        client.fetch_list(key).await.unwrap();

        let created = client
            .create(key, CreateTodoInput::new("Buy milk", 1))
            .await
            .unwrap();

        assert_eq!(created.id, 201);
        let page = client.cached_list(&key).unwrap();
        assert_eq!(page.todos, vec![created.clone()]);
        assert_eq!(page.total, 1);
        assert_eq!(client.cache().get_detail(201), Some(created));
    }

    #[tokio::test]
    async fn test_create_failure_rolls_back() {
        let (source, client) = client(vec![todo(1, 1, false)]);
        let key = ListKey::default();
        let before = client.fetch_list(key).await.unwrap();
        source.fail_writes(true);

        let err = client
            .create(key, CreateTodoInput::new("Buy milk", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream { status: 500, .. }));
        assert_eq!(client.cached_list(&key), Some(before));
    }

    #[tokio::test]
    async fn test_short_title_never_touches_cache_or_network() {
        let (source, client) = client(vec![todo(1, 1, false)]);
        let key = ListKey::default();
        let before = client.fetch_list(key).await.unwrap();
        let calls = source.calls();

        let err = client
            .create(key, CreateTodoInput::new("ab", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { field: "title", .. }));
        assert_eq!(source.calls(), calls);
        assert!(Arc::ptr_eq(&client.cached_list(&key).unwrap(), &before));
    }

    #[tokio::test]
    async fn test_update_failure_restores_pending_view() {
        let (source, client) = client(vec![todo(4, 1, false), todo(5, 1, false)]);
        let key = ListKey::new(TodoFilter::new(None, TodoStatus::Pending), PageRequest::default());
        client.fetch_list(key).await.unwrap();
        source.fail_writes(true);

        let current = todo(5, 1, false);
        let result = client
            .update(key, &current, UpdateTodoInput::default().completed(true))
            .await;

        assert!(result.is_err());
        let page = client.cached_list(&key).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.todos[1], current);
    }

    #[tokio::test]
    async fn test_update_success_drops_other_cached_pages() {
        let (_, client) = client(vec![todo(5, 1, false)]);
        let key = ListKey::default();
        let other = ListKey::new(TodoFilter::default(), PageRequest::new(2, 10));
        client.fetch_list(key).await.unwrap();
        client.fetch_list(other).await.unwrap();

        let updated = client
            .update(key, &todo(5, 1, false), UpdateTodoInput::default().title("Renamed"))
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert!(client.cached_list(&other).is_none());
        assert_eq!(client.cached_list(&key).unwrap().todos[0].title, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_then_detail_is_not_found() {
        let (_, client) = client(vec![todo(1, 1, false)]);
        let key = ListKey::default();
        client.fetch_list(key).await.unwrap();
        client.fetch_detail(1).await.unwrap();

        client.delete(key, 1).await.unwrap();

        assert!(client.cached_list(&key).unwrap().todos.is_empty());
        assert!(client.cache().get_detail(1).is_none());
        let err = client.fetch_detail(1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { id: 1 }));
    }
}
