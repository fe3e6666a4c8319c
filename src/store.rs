//! Observable filter selection, persisted between sessions.

use crate::error::Result;
use crate::models::{TodoFilter, TodoStatus};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

pub const FILTER_FILE: &str = "filters.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_user_id: Option<u64>,
    #[serde(default)]
    pub selected_status: TodoStatus,
}

impl FilterState {
    pub fn filter(&self) -> TodoFilter {
        TodoFilter::new(self.selected_user_id, self.selected_status)
    }

    pub fn is_active(&self) -> bool {
        self.selected_user_id.is_some() || self.selected_status != TodoStatus::All
    }
}

// On-disk layout: a single namespaced table
#[derive(Default, Serialize, Deserialize)]
struct Persisted {
    #[serde(rename = "taskflow-filters", default)]
    filters: FilterState,
}

pub struct FilterStore {
    state: watch::Sender<FilterState>,
    path: Option<PathBuf>,
}

impl FilterStore {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        FilterStore {
            state: watch::Sender::new(FilterState::default()),
            path: None,
        }
    }

    /// Loads the persisted selection from `path`. A missing file gives the
    /// defaults; an unreadable one is logged and ignored.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = match read_state(&path) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring saved filters");
                FilterState::default()
            }
        };
        FilterStore {
            state: watch::Sender::new(initial),
            path: Some(path),
        }
    }

    pub fn get(&self) -> FilterState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }

    pub fn set_selected_user_id(&self, user_id: Option<u64>) {
        self.update(|state| state.selected_user_id = user_id);
    }

    pub fn set_selected_status(&self, status: TodoStatus) {
        self.update(|state| state.selected_status = status);
    }

    pub fn clear_filters(&self) {
        self.update(|state| *state = FilterState::default());
    }

    fn update(&self, change: impl FnOnce(&mut FilterState)) {
        let mut next = self.get();
        change(&mut next);
        self.state.send_replace(next);

        if let Some(path) = &self.path {
            if let Err(err) = write_state(path, &next) {
                tracing::warn!(path = %path.display(), error = %err, "could not persist filters");
            }
        }
    }
}

fn read_state(path: &Path) -> Result<FilterState> {
    if !path.exists() {
        return Ok(FilterState::default());
    }
    let raw = fs::read_to_string(path)?;
    let persisted: Persisted = toml::from_str(&raw)?;
    Ok(persisted.filters)
}

fn write_state(path: &Path, state: &FilterState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let raw = toml::to_string(&Persisted { filters: *state })?;
    fs::write(path, raw)?;
    tracing::debug!(path = %path.display(), "filters saved");
    Ok(())
}
