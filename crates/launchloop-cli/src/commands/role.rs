//! Role chooser.

use clap::ValueEnum;
use launchloop_core::Dashboard;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Role {
    /// Register apps and share join links
    Creator,
    /// Join a campaign and keep the daily streak
    Tester,
}

pub async fn run(role: Role) -> super::CliResult {
    let store = super::open_store()?;
    let dashboard = match role {
        Role::Creator => Dashboard::Creator,
        Role::Tester => Dashboard::Tester,
    };
    store.set_last_dashboard(dashboard).await?;
    println!("{dashboard} dashboard selected");
    Ok(())
}
