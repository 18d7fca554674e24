//! Interactive three-step onboarding.

use std::io::{self, BufRead, Write};

use launchloop_core::{parse_join_link, Config, OnboardingSequencer, ValidationError};

/// Accept a bare campaign id or a join link on the configured host.
fn campaign_id_from(target: &str, host: &str) -> Result<String, ValidationError> {
    let target = target.trim();
    if let Some(id) = parse_join_link(target, host) {
        return Ok(id);
    }
    if target.contains("://") {
        return Err(ValidationError::InvalidJoinLink(target.to_string()));
    }
    if target.is_empty() || target.contains('/') {
        return Err(ValidationError::InvalidCampaignId(target.to_string()));
    }
    Ok(target.to_string())
}

fn confirm(label: &str) -> io::Result<bool> {
    print!("[{label}] press Enter to continue, or type q to quit: ");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(false);
    }
    Ok(!line.trim().eq_ignore_ascii_case("q"))
}

pub async fn run(target: &str, yes: bool) -> super::CliResult {
    let config = Config::load()?;
    let campaign_id = campaign_id_from(target, &config.links.host)?;
    let directory = super::directory(&config)?;
    let store = super::open_store()?;

    let mut sequencer = OnboardingSequencer::load(directory.as_ref(), &campaign_id).await;
    if let Some(message) = sequencer.progress().error() {
        return Err(message.to_string().into());
    }

    loop {
        let progress = sequencer.progress();
        let step = progress.step();
        println!();
        println!(
            "{} ({:.0}%)",
            step.title,
            progress.fraction() * 100.0
        );
        println!("  {}", step.description);
        println!("  {}", step.detail);
        println!("  Open: {}", step.action_url);

        if !yes && !confirm(&step.confirm_label)? {
            println!("Onboarding cancelled; nothing was saved.");
            return Ok(());
        }
        if progress.is_final_step() {
            break;
        }
        sequencer.advance();
    }

    let state = sequencer.finish(&store).await?;
    println!();
    println!("Joined campaign {}.", state.active_campaign_id);
    println!("Open the app every day and run `launchloop tester check-in`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "baijum.github.io";

    #[test]
    fn accepts_bare_id_and_link() {
        assert_eq!(campaign_id_from(" ABCD1234 ", HOST).unwrap(), "ABCD1234");
        assert_eq!(
            campaign_id_from("https://baijum.github.io/applaunchloop/join/ABCD1234", HOST).unwrap(),
            "ABCD1234"
        );
    }

    #[test]
    fn rejects_foreign_links_and_blank_ids() {
        assert!(matches!(
            campaign_id_from("https://other.example/applaunchloop/join/X", HOST),
            Err(ValidationError::InvalidJoinLink(_))
        ));
        assert!(matches!(
            campaign_id_from("  ", HOST),
            Err(ValidationError::InvalidCampaignId(_))
        ));
    }
}
