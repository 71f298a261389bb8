mod backend;
mod config;
pub mod database;
pub mod memory;
pub mod model;
mod store;
pub mod transfer;

pub use backend::StoreBackend;
pub use config::{Config, NotificationsConfig, StorageConfig, TagsConfig};
pub use database::Database;
pub use memory::MemoryBackend;
pub use model::{keys, BackendKind, ExportData, NewRecord, SettingValue, StudyRecord, TimerSnapshot};
pub use store::Store;
pub use transfer::{ImportDocument, ImportSummary};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory.
///
/// `STUDYTIMER_DATA_DIR` wins when set; otherwise `~/.config/studytimer[-dev]/`
/// based on `STUDYTIMER_ENV` (set it to `dev` for a development data directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYTIMER_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studytimer-dev")
            } else {
                base_dir.join("studytimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
