//! Speculative cache patches for create, update and delete.
//!
//! Each `begin` applies its patch synchronously and returns a pending handle
//! that owns the captured snapshots. The handle is consumed by exactly one of
//! `succeed` (reconcile with the server reply) or `fail` (restore the
//! snapshots verbatim), so a snapshot cannot outlive its mutation.
//!
//! Two mutations racing on one record are not coordinated: the later patch
//! wins, and a rollback from the earlier one can overwrite it.

use crate::cache::{ListKey, QueryCache};
use crate::models::{CreateTodoInput, Todo, TodoPage, TodoPatch, UpdateTodoInput};
use std::sync::Arc;

/// One past the largest cached id, or the current time in milliseconds when
/// there is nothing to compare against.
pub fn temporary_id(list: Option<&TodoPage>) -> u64 {
    match list.and_then(TodoPage::max_id) {
        Some(max) if max > 0 => max + 1,
        _ => chrono::Utc::now().timestamp_millis().unsigned_abs(),
    }
}

fn push_counted(page: &mut TodoPage, todo: Todo) {
    page.todos.push(todo);
    let total = page.total + 1;
    page.set_total(total);
}

fn remove_counted(page: &mut TodoPage, index: Option<usize>) {
    if let Some(index) = index {
        page.todos.remove(index);
    }
    let total = page.total.saturating_sub(1);
    page.set_total(total);
}

#[must_use]
pub struct PendingCreate {
    key: ListKey,
    previous: Option<Arc<TodoPage>>,
    temporary_id: u64,
}

impl PendingCreate {
    pub fn begin(cache: &QueryCache, key: ListKey, input: &CreateTodoInput) -> Self {
        let previous = cache.get_list(&key);
        let temporary_id = temporary_id(previous.as_deref());

        let speculative = Todo {
            id: temporary_id,
            user_id: input.user_id,
            title: input.title.clone(),
            completed: input.completed,
        };

        if key.filter.matches(&speculative) {
            let patched = cache.update_list(&key, |page| push_counted(page, speculative));
            if patched {
                tracing::debug!(temporary_id, "speculative create applied");
            }
        }

        PendingCreate {
            key,
            previous,
            temporary_id,
        }
    }

    pub fn temporary_id(&self) -> u64 {
        self.temporary_id
    }

    pub fn succeed(self, cache: &QueryCache, confirmed: &Todo) {
        let temporary_id = self.temporary_id;
        if self.key.filter.matches(confirmed) {
            cache.update_list(&self.key, |page| {
                if let Some(index) = page.position(temporary_id) {
                    page.todos[index] = confirmed.clone();
                }
            });
        } else {
            cache.update_list(&self.key, |page| {
                if let Some(index) = page.position(temporary_id) {
                    remove_counted(page, Some(index));
                }
            });
        }
        cache.set_detail(confirmed.clone());
        tracing::debug!(temporary_id, id = confirmed.id, "create reconciled");
    }

    pub fn fail(self, cache: &QueryCache) {
        if let Some(previous) = self.previous {
            cache.restore_list(self.key, previous);
        }
        tracing::debug!(temporary_id = self.temporary_id, "create rolled back");
    }
}

#[must_use]
pub struct PendingUpdate {
    key: ListKey,
    speculative: Todo,
    previous_list: Option<Arc<TodoPage>>,
    previous_detail: Option<Todo>,
}

impl PendingUpdate {
    pub fn begin(cache: &QueryCache, key: ListKey, current: &Todo, input: &UpdateTodoInput) -> Self {
        let speculative = input.merge_onto(current);
        let id = current.id;

        let previous_detail = cache.get_detail(id);
        if previous_detail.is_some() {
            cache.set_detail(speculative.clone());
        }

        let previous_list = cache.get_list(&key);
        let was_member = key.filter.matches(current);
        let is_member = key.filter.matches(&speculative);

        cache.update_list(&key, |page| {
            let index = page.position(id);
            match (is_member, index) {
                (true, Some(index)) => page.todos[index] = speculative.clone(),
                (true, None) => push_counted(page, speculative.clone()),
                (false, index) if was_member => remove_counted(page, index),
                (false, _) => {}
            }
        });
        tracing::debug!(id, was_member, is_member, "speculative update applied");

        PendingUpdate {
            key,
            speculative,
            previous_list,
            previous_detail,
        }
    }

    /// Merges the server echo over the speculative record. Fields the echo
    /// leaves out keep their submitted or pre-mutation value.
    pub fn succeed(self, cache: &QueryCache, confirmed: &TodoPatch) -> Todo {
        let id = self.speculative.id;
        let final_todo = confirmed.apply_to(&self.speculative);

        cache.update_list(&self.key, |page| {
            if let Some(index) = page.position(id) {
                page.todos[index] = final_todo.clone();
            }
        });
        cache.set_detail(final_todo.clone());
        tracing::debug!(id, "update reconciled");
        final_todo
    }

    pub fn fail(self, cache: &QueryCache) {
        let id = self.speculative.id;
        if let Some(previous) = self.previous_list {
            cache.restore_list(self.key, previous);
        }
        if let Some(previous) = self.previous_detail {
            cache.set_detail(previous);
        }
        tracing::debug!(id, "update rolled back");
    }
}

#[must_use]
pub struct PendingDelete {
    key: ListKey,
    id: u64,
    previous: Option<Arc<TodoPage>>,
}

impl PendingDelete {
    pub fn begin(cache: &QueryCache, key: ListKey, id: u64) -> Self {
        let previous = cache.get_list(&key);
        cache.update_list(&key, |page| {
            if let Some(index) = page.position(id) {
                remove_counted(page, Some(index));
            }
        });
        tracing::debug!(id, "speculative delete applied");

        PendingDelete { key, id, previous }
    }

    pub fn succeed(self, cache: &QueryCache) {
        cache.evict_detail(self.id);
        tracing::debug!(id = self.id, "delete confirmed");
    }

    pub fn fail(self, cache: &QueryCache) {
        if let Some(previous) = self.previous {
            cache.restore_list(self.key, previous);
        }
        tracing::debug!(id = self.id, "delete rolled back");
    }
}
