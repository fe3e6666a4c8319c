use crate::api::TodoSource;
use crate::cache::ListKey;
use crate::client::TodoClient;
use crate::error::{Error, Result};
use crate::models::{
    parse_user_id, CreateTodoInput, PageRequest, Todo, TodoPage, TodoStatus, UpdateTodoInput,
    User, MIN_TITLE_LEN,
};
use crate::store::{FilterState, FilterStore};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::TableState;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub enum InputMode {
    Normal,
    Editing,
    Insert,
    ConfirmDelete,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActiveInput {
    Title,
    User,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Toast {
    Success(String),
    Error(String),
}

/// Create/edit form. `editing` holds the record being edited, `None` for a new task.
#[derive(Default)]
pub struct TaskForm {
    pub editing: Option<Todo>,
    pub title: String,
    pub user_id: String,
    pub completed: bool,
    pub error: Option<String>,
}

impl TaskForm {
    fn for_task(task: &Todo) -> Self {
        TaskForm {
            editing: Some(task.clone()),
            title: task.title.clone(),
            user_id: task.user_id.to_string(),
            completed: task.completed,
            error: None,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.title.trim().chars().count() >= MIN_TITLE_LEN && !self.user_id.trim().is_empty()
    }
}

/// Result of a mutation that ran in the background.
pub enum Outcome {
    Created(Result<Todo>),
    Updated(Result<Todo>),
    Deleted(u64, Result<()>),
}

pub struct App<S> {
    client: TodoClient<S>,
    pub users: Vec<User>,
    filters: FilterStore,
    filter_changes: watch::Receiver<FilterState>,
    pub page: usize,
    pub page_size: usize,
    pub state: TableState,
    pub detail_id: Option<u64>,
    pub input_mode: InputMode,
    pub active_input: ActiveInput,
    pub form: TaskForm,
    pub deleting: Option<u64>,
    pub toast: Option<Toast>,
    pub load_error: Option<String>,
    pending: usize,
    stale: bool,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl<S: TodoSource + 'static> App<S> {
    pub fn new(client: TodoClient<S>, users: Vec<User>, filters: FilterStore, page_size: usize) -> App<S> {
        let filter_changes = filters.subscribe();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        App {
            client,
            users,
            filters,
            filter_changes,
            page: 1,
            page_size,
            state: TableState::default(),
            detail_id: None,
            input_mode: InputMode::Normal,
            active_input: ActiveInput::Title,
            form: TaskForm::default(),
            deleting: None,
            toast: None,
            load_error: None,
            pending: 0,
            stale: false,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn filter_state(&self) -> FilterState {
        self.filters.get()
    }

    pub fn list_key(&self) -> ListKey {
        ListKey::new(
            self.filters.get().filter(),
            PageRequest::new(self.page, self.page_size),
        )
    }

    pub fn current_page(&self) -> Option<Arc<TodoPage>> {
        self.client.cached_list(&self.list_key())
    }

    pub fn detail(&self) -> Option<Todo> {
        self.detail_id.and_then(|id| self.client.cache().get_detail(id))
    }

    pub fn user_name(&self, user_id: u64) -> Option<&str> {
        self.users
            .iter()
            .find(|user| user.id == user_id)
            .map(|user| user.name.as_str())
    }

    /// Display label for a status, as the status options procedure names it.
    pub fn status_label(&self, status: TodoStatus) -> String {
        self.client
            .status_options()
            .into_iter()
            .find(|option| option.value == status.value())
            .map(|option| option.label)
            .unwrap_or_else(|| status.value().to_string())
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    fn selected_task(&self) -> Option<Todo> {
        let page = self.current_page()?;
        let index = self.state.selected()?;
        page.todos.get(index).cloned()
    }

    /// Loads the current view unless it is already cached.
    pub async fn load(&mut self) {
        if self.current_page().is_none() {
            self.refresh_tasks().await;
        } else {
            self.clamp_selection();
        }
    }

    pub async fn refresh_tasks(&mut self) {
        match self.client.fetch_list(self.list_key()).await {
            Ok(_) => {
                self.load_error = None;
                self.clamp_selection();
            }
            Err(err) => {
                tracing::error!(error = %err, "could not load tasks");
                self.load_error = Some("Failed to load tasks. Please try again later.".to_string());
            }
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.current_page().map(|page| page.todos.len()).unwrap_or(0);
        match (len, self.state.selected()) {
            (0, _) => self.state.select(None),
            (_, Some(i)) if i >= len => self.state.select(Some(len - 1)),
            (_, None) => self.state.select(Some(0)),
            _ => {}
        }
    }

    pub fn total_pages(&self) -> usize {
        self.current_page().map(|page| page.total_pages).unwrap_or(0)
    }

    pub async fn next_page(&mut self) {
        if self.page < self.total_pages() {
            self.page += 1;
            self.state.select(Some(0));
            self.load().await;
        }
    }

    pub async fn previous_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
            self.state.select(Some(0));
            self.load().await;
        }
    }

    pub fn next(&mut self) {
        let len = self.current_page().map(|page| page.todos.len()).unwrap_or(0);
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.current_page().map(|page| page.todos.len()).unwrap_or(0);
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn cycle_user_filter(&self) {
        let current = self.filters.get().selected_user_id;
        let next = match current {
            None => self.users.first().map(|user| user.id),
            Some(id) => self
                .users
                .iter()
                .skip_while(|user| user.id != id)
                .nth(1)
                .map(|user| user.id),
        };
        self.filters.set_selected_user_id(next);
    }

    /// Any filter change sends the view back to the first page.
    async fn sync_filters(&mut self) {
        if self.filter_changes.has_changed().unwrap_or(false) {
            let _ = self.filter_changes.borrow_and_update();
            self.page = 1;
            self.state.select(Some(0));
            self.load().await;
        }
    }

    pub async fn select_task(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        match self.client.fetch_detail(task.id).await {
            Ok(_) => self.detail_id = Some(task.id),
            Err(Error::NotFound { id }) => {
                self.detail_id = None;
                self.toast = Some(Toast::Error(format!("Task {} not found", id)));
            }
            Err(err) => {
                self.toast = Some(Toast::Error(format!("Error fetching task details: {}", err)));
            }
        }
    }

    fn open_form(&mut self, task: Option<&Todo>) {
        self.form = match task {
            Some(task) => TaskForm::for_task(task),
            None => TaskForm::default(),
        };
        self.active_input = ActiveInput::Title;
        self.input_mode = InputMode::Editing;
    }

    fn close_form(&mut self) {
        self.form = TaskForm::default();
        self.input_mode = InputMode::Normal;
    }

    fn submit_form(&mut self) {
        if !self.form.is_valid() {
            self.form.error = Some(format!(
                "Title must be at least {} characters and a user must be selected",
                MIN_TITLE_LEN
            ));
            return;
        }

        let key = self.list_key();
        let client = self.client.clone();
        let tx = self.outcome_tx.clone();

        match self.form.editing.clone() {
            Some(current) => {
                let user_id = match parse_user_id(&self.form.user_id) {
                    Ok(id) => id,
                    Err(err) => {
                        self.form.error = Some(err.to_string());
                        return;
                    }
                };
                let input = UpdateTodoInput::default()
                    .title(self.form.title.trim())
                    .user_id(user_id)
                    .completed(self.form.completed);
                self.pending += 1;
                tokio::spawn(async move {
                    let result = client.update(key, &current, input).await;
                    let _ = tx.send(Outcome::Updated(result));
                });
            }
            None => {
                let input = match CreateTodoInput::from_form(
                    &self.form.title,
                    &self.form.user_id,
                    self.form.completed,
                ) {
                    Ok(input) => input,
                    Err(err) => {
                        self.form.error = Some(err.to_string());
                        return;
                    }
                };
                self.pending += 1;
                tokio::spawn(async move {
                    let result = client.create(key, input).await;
                    let _ = tx.send(Outcome::Created(result));
                });
            }
        }
        self.form.error = None;
    }

    fn confirm_delete(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(id) = self.deleting else {
            return;
        };
        let key = self.list_key();
        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let result = client.delete(key, id).await;
            let _ = tx.send(Outcome::Deleted(id, result));
        });
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        self.pending = self.pending.saturating_sub(1);
        match outcome {
            Outcome::Created(Ok(_)) => {
                self.toast = Some(Toast::Success("Task created successfully".to_string()));
                self.close_form();
            }
            Outcome::Created(Err(err)) => {
                self.toast = Some(Toast::Error(format!("Failed to create task: {}", err)));
            }
            Outcome::Updated(Ok(_)) => {
                self.toast = Some(Toast::Success("Task updated successfully".to_string()));
                self.close_form();
            }
            Outcome::Updated(Err(err)) => {
                self.toast = Some(Toast::Error(format!("Failed to update task: {}", err)));
            }
            Outcome::Deleted(id, result) => {
                self.deleting = None;
                match result {
                    Ok(()) => {
                        if self.detail_id == Some(id) {
                            self.detail_id = None;
                        }
                        self.toast = Some(Toast::Success("Task deleted successfully".to_string()));
                    }
                    Err(err) => {
                        self.toast = Some(Toast::Error(format!("Failed to delete task: {}", err)));
                    }
                }
            }
        }

        // A delete can empty the last page; step back to the new last one.
        if let Some(page) = self.current_page() {
            let last = page.total_pages.max(1);
            if self.page > last {
                self.page = last;
                self.state.select(Some(0));
            }
        }
        // Other pages are evicted after a write, including one the user moved to meanwhile.
        self.stale = self.current_page().is_none();
        self.clamp_selection();
    }

    /// Refetches the current view if a finished mutation evicted it.
    pub async fn reload_if_stale(&mut self) {
        if self.stale {
            self.stale = false;
            self.load().await;
        }
    }

    /// Applies every mutation that finished since the last call.
    pub fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome);
        }
    }

    #[cfg(test)]
    pub async fn settle_next(&mut self) {
        if let Some(outcome) = self.outcome_rx.recv().await {
            self.apply_outcome(outcome);
        }
    }

    pub async fn handle_input(&mut self, key: KeyEvent) -> bool {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('n') | KeyCode::Right => self.next_page().await,
                KeyCode::Char('p') | KeyCode::Left => self.previous_page().await,
                KeyCode::Char('u') => {
                    self.cycle_user_filter();
                    self.sync_filters().await;
                }
                KeyCode::Char('s') => {
                    let status = self.filters.get().selected_status.next();
                    self.filters.set_selected_status(status);
                    self.sync_filters().await;
                }
                KeyCode::Char('c') => {
                    self.filters.clear_filters();
                    self.sync_filters().await;
                }
                KeyCode::Char('r') => {
                    self.client.cache().invalidate_lists();
                    self.refresh_tasks().await;
                }
                KeyCode::Char('a') => self.open_form(None),
                KeyCode::Char('e') => {
                    if let Some(task) = self.selected_task() {
                        self.open_form(Some(&task));
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(task) = self.selected_task() {
                        self.deleting = Some(task.id);
                        self.input_mode = InputMode::ConfirmDelete;
                    }
                }
                KeyCode::Enter => self.select_task().await,
                _ => {}
            },

            InputMode::Editing => match key.code {
                KeyCode::Char('i') => {
                    self.input_mode = InputMode::Insert;
                }
                KeyCode::Tab => {
                    self.active_input = match self.active_input {
                        ActiveInput::Title => ActiveInput::User,
                        ActiveInput::User => ActiveInput::Title,
                    };
                }
                KeyCode::Char(' ') => {
                    self.form.completed = !self.form.completed;
                }
                KeyCode::Enter => {
                    if !self.is_busy() {
                        self.submit_form();
                    }
                }
                KeyCode::Esc => {
                    if !self.is_busy() {
                        self.close_form();
                    }
                }
                _ => {}
            },

            InputMode::Insert => match key.code {
                KeyCode::Char(c) => match self.active_input {
                    ActiveInput::Title => self.form.title.push(c),
                    ActiveInput::User => self.form.user_id.push(c),
                },
                KeyCode::Backspace => match self.active_input {
                    ActiveInput::Title => {
                        self.form.title.pop();
                    }
                    ActiveInput::User => {
                        self.form.user_id.pop();
                    }
                },
                KeyCode::Esc => {
                    self.input_mode = InputMode::Editing;
                }
                _ => {}
            },

            InputMode::ConfirmDelete => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.deleting = None;
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use crate::query::sample_todos;
    use crate::router::create_caller;
    use crate::testing::{user, FakeSource};

    async fn app_with(todos: Vec<Todo>) -> (Arc<FakeSource>, App<FakeSource>) {
        let source = Arc::new(FakeSource::with_todos(todos));
        let router = create_caller(Arc::clone(&source));
        let client = TodoClient::new(router.todo, QueryCache::new());
        let users = vec![user(1, "Leanne"), user(2, "Ervin"), user(3, "Clementine")];
        let mut app = App::new(client, users, FilterStore::in_memory(), 10);
        app.load().await;
        (source, app)
    }

    async fn press(app: &mut App<FakeSource>, code: KeyCode) -> bool {
        app.handle_input(KeyEvent::from(code)).await
    }

    async fn type_text(app: &mut App<FakeSource>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c)).await;
        }
    }

    #[tokio::test]
    async fn test_paging_clamps_to_range() {
        let (_, mut app) = app_with(sample_todos(25)).await;
        assert_eq!(app.total_pages(), 3);

        press(&mut app, KeyCode::Char('p')).await;
        assert_eq!(app.page, 1);

        for _ in 0..5 {
            press(&mut app, KeyCode::Char('n')).await;
        }
        assert_eq!(app.page, 3);
        assert_eq!(app.current_page().unwrap().todos.len(), 5);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let (_, mut app) = app_with(sample_todos(25)).await;
        press(&mut app, KeyCode::Char('n')).await;
        assert_eq!(app.page, 2);

        press(&mut app, KeyCode::Char('s')).await;
        assert_eq!(app.page, 1);
        assert_eq!(app.filter_state().selected_status, TodoStatus::Completed);
        assert!(app.current_page().unwrap().todos.iter().all(|t| t.completed));
    }

    #[tokio::test]
    async fn test_user_filter_cycles_back_to_any() {
        let (_, mut app) = app_with(sample_todos(25)).await;
        let mut seen = Vec::new();
        for _ in 0..4 {
            press(&mut app, KeyCode::Char('u')).await;
            seen.push(app.filter_state().selected_user_id);
        }
        assert_eq!(seen, vec![Some(1), Some(2), Some(3), None]);

        press(&mut app, KeyCode::Char('u')).await;
        press(&mut app, KeyCode::Char('c')).await;
        assert!(!app.filter_state().is_active());
    }

    #[tokio::test]
    async fn test_create_through_form() {
        let (_, mut app) = app_with(sample_todos(3)).await;

        press(&mut app, KeyCode::Char('a')).await;
        press(&mut app, KeyCode::Char('i')).await;
        type_text(&mut app, "Water plants").await;
        press(&mut app, KeyCode::Esc).await;
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Char('i')).await;
        type_text(&mut app, "2").await;
        press(&mut app, KeyCode::Esc).await;
        press(&mut app, KeyCode::Enter).await;

        app.settle_next().await;

        assert_eq!(app.toast, Some(Toast::Success("Task created successfully".to_string())));
        assert!(matches!(app.input_mode, InputMode::Normal));
        let page = app.current_page().unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.todos.last().map(|t| t.id), Some(201));
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_submitted() {
        let (source, mut app) = app_with(sample_todos(3)).await;
        let calls = source.calls();

        press(&mut app, KeyCode::Char('a')).await;
        press(&mut app, KeyCode::Char('i')).await;
        type_text(&mut app, "ab").await;
        press(&mut app, KeyCode::Esc).await;
        press(&mut app, KeyCode::Enter).await;

        assert!(app.form.error.is_some());
        assert!(!app.is_busy());
        assert!(matches!(app.input_mode, InputMode::Editing));
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn test_failed_delete_restores_row() {
        let (source, mut app) = app_with(sample_todos(3)).await;
        source.fail_writes(true);

        press(&mut app, KeyCode::Char('d')).await;
        assert_eq!(app.deleting, Some(1));
        press(&mut app, KeyCode::Char('y')).await;
        app.settle_next().await;

        assert!(matches!(app.toast, Some(Toast::Error(_))));
        assert_eq!(app.deleting, None);
        assert_eq!(app.current_page().unwrap().total, 3);
    }

    #[tokio::test]
    async fn test_page_visited_during_delete_is_refetched() {
        let (_, mut app) = app_with(sample_todos(25)).await;

        press(&mut app, KeyCode::Char('d')).await;
        press(&mut app, KeyCode::Char('y')).await;
        press(&mut app, KeyCode::Char('n')).await;
        assert_eq!(app.page, 2);

        app.settle_next().await;
        assert!(app.current_page().is_none());

        app.reload_if_stale().await;
        let page = app.current_page().unwrap();
        assert_eq!(page.total, 24);
        assert_eq!(page.todos.first().map(|t| t.id), Some(12));
    }

    #[tokio::test]
    async fn test_deleting_last_row_steps_back_a_page() {
        let (_, mut app) = app_with(sample_todos(21)).await;
        press(&mut app, KeyCode::Char('n')).await;
        press(&mut app, KeyCode::Char('n')).await;
        assert_eq!(app.page, 3);
        assert_eq!(app.current_page().unwrap().todos.len(), 1);

        press(&mut app, KeyCode::Char('d')).await;
        press(&mut app, KeyCode::Char('y')).await;
        app.settle_next().await;
        assert_eq!(app.page, 2);

        app.reload_if_stale().await;
        let page = app.current_page().unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.todos.len(), 10);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_detail_view_follows_cache() {
        let (_, mut app) = app_with(sample_todos(3)).await;
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.detail().map(|t| t.id), Some(1));
        assert_eq!(app.user_name(1), Some("Leanne"));
        assert_eq!(app.status_label(TodoStatus::All), "All Status");
    }
}
