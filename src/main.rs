mod api;
mod app;
mod cache;
mod client;
mod config;
mod error;
mod models;
mod mutation;
mod query;
mod router;
mod store;
#[cfg(test)]
mod testing;
mod ui;

use api::JsonPlaceholder;
use app::App;
use cache::QueryCache;
use client::TodoClient;
use config::Config;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dotenv::dotenv;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, File};
use std::io;
use std::sync::{Arc, Mutex};
use store::FilterStore;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &Config) -> io::Result<()> {
    let path = config.log_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::load()?;
    init_logging(&config)?;
    tracing::info!(api = %config.api_base_url, page_size = config.page_size, "starting taskflow");

    let source = Arc::new(JsonPlaceholder::new(&config.api_base_url));
    let router = router::create_caller(source);

    let users = match router.user.get_all().await {
        Ok(users) => users,
        Err(err) => {
            tracing::warn!(error = %err, "could not load users");
            Vec::new()
        }
    };

    let filters = FilterStore::load(config.filter_file());
    let client = TodoClient::new(router.todo, QueryCache::new());
    let app = App::new(client, users, filters, config.page_size);

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "terminal error");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
