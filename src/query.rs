//! Filtering and pagination over a fetched todo snapshot.
//!
//! Everything here is a pure function of its inputs: the upstream snapshot is
//! borrowed, never modified, and identical arguments give identical pages.

use crate::models::{PageRequest, Todo, TodoFilter, TodoPage, TodoStatus};

pub fn matches_user_id(todo_user_id: u64, filter_user_id: Option<u64>) -> bool {
    filter_user_id.map_or(true, |id| id == todo_user_id)
}

pub fn matches_status(completed: bool, status: TodoStatus) -> bool {
    match status {
        TodoStatus::All => true,
        TodoStatus::Completed => completed,
        TodoStatus::Pending => !completed,
    }
}

/// Filter-membership predicate shared by queries and optimistic reconciliation.
pub fn should_include(todo: &Todo, filter: &TodoFilter) -> bool {
    matches_user_id(todo.user_id, filter.user_id) && matches_status(todo.completed, filter.status)
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Applies `filter` then slices out `page`. Pages past the end are empty.
///
/// `page.page` and `page.page_size` must be positive; the router rejects
/// anything else before calling in.
pub fn paginate(todos: &[Todo], filter: &TodoFilter, page: PageRequest) -> TodoPage {
    let matching: Vec<&Todo> = todos.iter().filter(|todo| should_include(todo, filter)).collect();
    let total = matching.len();

    let start = page.page.saturating_sub(1).saturating_mul(page.page_size);
    let records = matching
        .into_iter()
        .skip(start)
        .take(page.page_size)
        .cloned()
        .collect();

    TodoPage {
        todos: records,
        total,
        page: page.page,
        page_size: page.page_size,
        total_pages: total_pages(total, page.page_size),
    }
}

#[cfg(test)]
pub(crate) fn sample_todos(count: u64) -> Vec<Todo> {
    (1..=count)
        .map(|id| Todo {
            id,
            user_id: (id - 1) / 10 + 1,
            title: format!("task number {}", id),
            completed: id % 2 == 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_page_of_twenty_five() {
        let todos = sample_todos(25);
        let page = paginate(&todos, &TodoFilter::default(), PageRequest::new(2, 10));
        let ids: Vec<u64> = page.todos.iter().map(|t| t.id).collect();
        assert_eq!(ids, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 10);
    }

    #[test]
    fn test_page_beyond_range_is_empty_with_total() {
        let todos = sample_todos(25);
        let page = paginate(&todos, &TodoFilter::default(), PageRequest::new(9, 10));
        assert!(page.todos.is_empty());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_total_pages_independent_of_requested_page() {
        let todos = sample_todos(37);
        let filters = [
            TodoFilter::default(),
            TodoFilter::new(Some(2), TodoStatus::All),
            TodoFilter::new(None, TodoStatus::Pending),
            TodoFilter::new(Some(4), TodoStatus::Completed),
            TodoFilter::new(Some(99), TodoStatus::All),
        ];
        for filter in filters {
            for page_size in 1..=12 {
                let first = paginate(&todos, &filter, PageRequest::new(1, page_size));
                assert_eq!(first.total_pages, first.total.div_ceil(page_size));
                for page in 1..=first.total_pages + 2 {
                    let other = paginate(&todos, &filter, PageRequest::new(page, page_size));
                    assert_eq!(other.total_pages, first.total_pages);
                    assert_eq!(other.total, first.total);
                    assert!(other.todos.len() <= page_size);
                    if page > first.total_pages {
                        assert!(other.todos.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_filters_by_user_and_status() {
        let todos = sample_todos(30);
        let page = paginate(
            &todos,
            &TodoFilter::new(Some(2), TodoStatus::Completed),
            PageRequest::new(1, 50),
        );
        assert_eq!(page.total, 5);
        assert!(page.todos.iter().all(|t| t.user_id == 2 && t.completed));
    }

    #[test]
    fn test_unknown_user_yields_zero_pages() {
        let todos = sample_todos(10);
        let page = paginate(&todos, &TodoFilter::new(Some(500), TodoStatus::All), PageRequest::default());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.todos.is_empty());
    }

    #[test]
    fn test_paginate_is_deterministic() {
        let todos = sample_todos(25);
        let filter = TodoFilter::new(None, TodoStatus::Pending);
        let a = paginate(&todos, &filter, PageRequest::new(2, 4));
        let b = paginate(&todos, &filter, PageRequest::new(2, 4));
        assert_eq!(a, b);
        assert_eq!(todos, sample_todos(25));
    }

    #[test]
    fn test_status_predicate() {
        assert!(matches_status(true, TodoStatus::All));
        assert!(matches_status(false, TodoStatus::All));
        assert!(matches_status(true, TodoStatus::Completed));
        assert!(!matches_status(false, TodoStatus::Completed));
        assert!(matches_status(false, TodoStatus::Pending));
        assert!(!matches_status(true, TodoStatus::Pending));
    }
}
