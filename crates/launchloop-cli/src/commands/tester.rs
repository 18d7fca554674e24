//! Tester dashboard subcommands.

use clap::Subcommand;
use launchloop_core::{StreakEngine, TesterView};

#[derive(Subcommand)]
pub enum TesterAction {
    /// Show the current campaign and streak
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record that the app was opened and tested today
    CheckIn,
    /// Reset the streak to zero
    Reset,
}

pub async fn run(action: TesterAction) -> super::CliResult {
    let store = super::open_store()?;

    match action {
        TesterAction::Status { json } => {
            let view = TesterView::from_state(&store.snapshot());
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else if !view.has_active_campaign {
                println!("No active campaign. Join one with `launchloop onboard <ID|LINK>`.");
            } else {
                println!("Campaign: {}", view.campaign_id);
                println!("App:      {}", view.target_package);
                println!("Streak:   {} / {} days", view.streak, view.goal);
                if view.is_complete {
                    println!("Testing complete. Thank you!");
                }
            }
        }
        TesterAction::CheckIn => {
            let before = store.snapshot();
            if !before.has_active_campaign() {
                return Err("no active campaign; run `launchloop onboard <ID|LINK>` first".into());
            }
            let after = store
                .record_completion(&StreakEngine::local(), super::now_millis())
                .await?;
            let view = TesterView::from_state(&after);
            if after.streak_count == before.streak_count {
                if view.is_complete {
                    println!("Testing already complete ({} / {} days).", view.streak, view.goal);
                } else {
                    println!("Already checked in today ({} / {} days).", view.streak, view.goal);
                }
            } else {
                println!("Day {} of {} recorded.", view.streak, view.goal);
                if view.is_complete {
                    println!("Testing complete. Thank you!");
                }
            }
        }
        TesterAction::Reset => {
            store.reset_streak().await?;
            println!("streak reset");
        }
    }
    Ok(())
}
