mod config;
pub mod store;

pub use config::{Config, DirectoryConfig, LinksConfig, ReminderConfig};
pub use store::CampaignStore;

use std::path::PathBuf;

/// Returns `~/.config/launchloop[-dev]/` based on LAUNCHLOOP_ENV.
///
/// Set LAUNCHLOOP_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LAUNCHLOOP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("launchloop-dev")
    } else {
        base_dir.join("launchloop")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
