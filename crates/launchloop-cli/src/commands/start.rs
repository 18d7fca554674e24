use launchloop_core::{parse_join_link, start_destination, Config, Destination};
use tracing::warn;

pub async fn run(link: Option<String>) -> super::CliResult {
    let config = Config::load()?;
    let store = super::open_store()?;

    let deep_link = link.as_deref().and_then(|url| {
        let id = parse_join_link(url, &config.links.host);
        if id.is_none() {
            warn!(%url, "ignoring link that is not a campaign join link");
        }
        id
    });

    match start_destination(deep_link.as_deref(), store.snapshot().last_dashboard) {
        Destination::RoleChooser => {
            println!("role-chooser");
            println!("Run `launchloop role creator` or `launchloop role tester` to continue.");
        }
        Destination::CreatorDashboard => println!("creator-dashboard"),
        Destination::TesterDashboard => println!("tester-dashboard"),
        Destination::Onboarding(id) => {
            println!("onboarding {id}");
            println!("Run `launchloop onboard {id}` to join.");
        }
    }
    Ok(())
}
