//! Creator dashboard subcommands.

use clap::Subcommand;
use launchloop_core::device_id::get_or_create_device_id;
use launchloop_core::{join_link, CampaignService, Config};

#[derive(Subcommand)]
pub enum CreatorAction {
    /// Register a new campaign
    Create {
        /// Google Group testers join (e.g. testers@googlegroups.com)
        #[arg(long)]
        group_email: String,
        /// Android package name of the app under test
        #[arg(long)]
        package: String,
    },
    /// List campaigns created on this device
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a campaign
    Delete {
        /// Campaign ID
        id: String,
    },
    /// Print the join link for a campaign
    Link {
        /// Campaign ID
        id: String,
    },
}

pub async fn run(action: CreatorAction) -> super::CliResult {
    let config = Config::load()?;

    if let CreatorAction::Link { id } = &action {
        println!("{}", join_link(&config.links.host, id.trim()));
        return Ok(());
    }

    let service = CampaignService::new(
        super::directory(&config)?,
        super::open_store()?,
        get_or_create_device_id()?,
        config.links.host.clone(),
    );

    match action {
        CreatorAction::Create {
            group_email,
            package,
        } => {
            let meta = service
                .create_campaign(&group_email, &package, super::now_millis())
                .await?;
            println!("Campaign created: {}", meta.campaign_id);
            println!("Join link: {}", service.join_link(&meta.campaign_id));
        }
        CreatorAction::List { json } => {
            let campaigns = service.my_campaigns().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&campaigns)?);
            } else if campaigns.is_empty() {
                println!("No campaigns yet. Create one with `launchloop creator create`.");
            } else {
                for meta in &campaigns {
                    let package = if meta.package_name.is_empty() {
                        "(unavailable)"
                    } else {
                        meta.package_name.as_str()
                    };
                    println!("{}  {}  {}", meta.campaign_id, package, meta.google_group_email);
                    println!("    {}", service.join_link(&meta.campaign_id));
                }
            }
        }
        CreatorAction::Delete { id } => {
            service.delete_campaign(&id).await?;
            println!("Campaign deleted: {}", id.trim());
        }
        CreatorAction::Link { .. } => {}
    }
    Ok(())
}
