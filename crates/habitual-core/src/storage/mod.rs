mod config;
pub mod database;
mod history_store;
pub mod migrations;

pub use config::{Config, NotificationsConfig, NotifierBackend, PredictorConfig, SchedulerConfig};
pub use database::Database;
pub use history_store::HistoryStore;

use std::path::PathBuf;

/// Returns `~/.config/habitual[-dev]/` based on HABITUAL_ENV.
///
/// Set HABITUAL_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITUAL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitual-dev")
    } else {
        base_dir.join("habitual")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
