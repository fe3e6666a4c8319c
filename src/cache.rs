//! Client-side query cache.
//!
//! Lists are cached per filter/page key, single records per id. List pages are
//! stored behind `Arc` and never modified in place: writers clone, patch and
//! swap in a new `Arc`, so a snapshot handed out earlier stays exactly as it
//! was captured and can be put back verbatim on rollback.

use crate::models::{PageRequest, Todo, TodoFilter, TodoPage};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub filter: TodoFilter,
    pub page: PageRequest,
}

impl ListKey {
    pub fn new(filter: TodoFilter, page: PageRequest) -> Self {
        ListKey { filter, page }
    }
}

#[derive(Default)]
struct Entries {
    lists: HashMap<ListKey, Arc<TodoPage>>,
    details: HashMap<u64, Todo>,
}

#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<RwLock<Entries>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_list(&self, key: &ListKey) -> Option<Arc<TodoPage>> {
        self.entries.read().lists.get(key).cloned()
    }

    /// Puts a previously captured snapshot back under `key`.
    pub fn restore_list(&self, key: ListKey, snapshot: Arc<TodoPage>) {
        self.entries.write().lists.insert(key, snapshot);
    }

    /// Copy-on-write patch of a cached list. Returns false when the key is not cached.
    pub fn update_list<F>(&self, key: &ListKey, patch: F) -> bool
    where
        F: FnOnce(&mut TodoPage),
    {
        let mut entries = self.entries.write();
        match entries.lists.get_mut(key) {
            Some(current) => {
                let mut next = (**current).clone();
                patch(&mut next);
                *current = Arc::new(next);
                true
            }
            None => false,
        }
    }

    pub fn invalidate_lists(&self) {
        self.entries.write().lists.clear();
    }

    /// Drops every cached list except the one under `keep`.
    pub fn invalidate_lists_except(&self, keep: &ListKey) {
        self.entries.write().lists.retain(|key, _| key == keep);
    }

    pub fn get_detail(&self, id: u64) -> Option<Todo> {
        self.entries.read().details.get(&id).cloned()
    }

    pub fn set_detail(&self, todo: Todo) {
        self.entries.write().details.insert(todo.id, todo);
    }

    pub fn evict_detail(&self, id: u64) {
        self.entries.write().details.remove(&id);
    }
}
