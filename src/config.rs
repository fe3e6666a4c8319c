use crate::api::DEFAULT_BASE_URL;
use crate::error::{Error, Result};
use crate::models::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "taskflow";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub page_size: usize,
    pub state_dir: PathBuf,
}

// config.toml, every key optional
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_base_url: Option<String>,
    page_size: Option<usize>,
    state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            state_dir: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
        }
    }
}

impl Config {
    /// Defaults, then `<config dir>/taskflow/config.toml`, then environment.
    pub fn load() -> Result<Config> {
        let mut config = Config::default();
        let file = config.state_dir.join("config.toml");
        config.apply_file(&file)?;
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let raw = fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&raw)?;

        if let Some(url) = file.api_base_url {
            self.api_base_url = url;
        }
        if let Some(page_size) = file.page_size {
            self.page_size = check_page_size(page_size)?;
        }
        if let Some(dir) = file.state_dir {
            self.state_dir = dir;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("TASKFLOW_API_URL") {
            self.api_base_url = url;
        }
        if let Some(raw) = var("TASKFLOW_PAGE_SIZE") {
            let page_size = raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("TASKFLOW_PAGE_SIZE must be a positive integer, got '{}'", raw))
            })?;
            self.page_size = check_page_size(page_size)?;
        }
        if let Some(dir) = var("TASKFLOW_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn filter_file(&self) -> PathBuf {
        self.state_dir.join(crate::store::FILTER_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| self.state_dir.clone())
            .join(APP_DIR)
            .join("taskflow.log")
    }
}

fn check_page_size(page_size: usize) -> Result<usize> {
    if page_size == 0 {
        return Err(Error::Config("page size must be a positive integer".to_string()));
    }
    Ok(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "https://jsonplaceholder.typicode.com");
        assert_eq!(config.page_size, 10);
        assert!(config.filter_file().ends_with("taskflow/filters.toml"));
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_base_url = \"http://file\"\npage_size = 5\n").unwrap();

        let mut config = Config::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.api_base_url, "http://file");
        assert_eq!(config.page_size, 5);

        config
            .apply_env(env_of(&[("TASKFLOW_API_URL", "http://env"), ("TASKFLOW_STATE_DIR", "/tmp/tf")]))
            .unwrap();
        assert_eq!(config.api_base_url, "http://env");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.state_dir, PathBuf::from("/tmp/tf"));
    }

    #[test]
    fn test_rejects_bad_page_size() {
        let mut config = Config::default();
        let err = config
            .apply_env(env_of(&[("TASKFLOW_PAGE_SIZE", "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = config
            .apply_env(env_of(&[("TASKFLOW_PAGE_SIZE", "ten")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_fine() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.apply_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
