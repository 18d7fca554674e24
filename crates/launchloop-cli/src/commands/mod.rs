//! Subcommand implementations and the handles they share.

pub mod config;
pub mod creator;
pub mod onboard;
pub mod role;
pub mod start;
pub mod tester;
pub mod worker;

use std::sync::Arc;

use launchloop_core::{CampaignDirectory, CampaignStore, Config, FirestoreDirectory};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn open_store() -> Result<CampaignStore, Box<dyn std::error::Error>> {
    Ok(CampaignStore::open_default()?)
}

pub fn directory(config: &Config) -> Result<Arc<dyn CampaignDirectory>, Box<dyn std::error::Error>> {
    Ok(Arc::new(FirestoreDirectory::new(&config.directory)?))
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
