//! Background daily reminder.

use clap::Subcommand;
use launchloop_core::trigger::scheduler::run_with_budget;
use launchloop_core::{
    CampaignStore, Config, DailyCheck, ExistingWorkPolicy, LogNotifier, PeriodicWork, StreakEngine,
    WorkScheduler,
};
use tracing::{info, warn};

/// A lease not renewed for this long is considered abandoned.
const LEASE_TTL_MS: i64 = 5 * 60 * 1000;

/// Keep the worker lease fresh while the scheduler runs.
async fn renew_lease(store: CampaignStore, name: String, owner: String) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
        (LEASE_TTL_MS / 3) as u64,
    ));
    loop {
        ticker.tick().await;
        match store
            .acquire_worker_lease(name.as_str(), owner.as_str(), super::now_millis(), LEASE_TTL_MS)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(%name, "worker lease taken over by another process"),
            Err(err) => warn!(%name, error = %err, "failed to renew worker lease"),
        }
    }
}

#[derive(Subcommand)]
pub enum WorkerAction {
    /// Run a single daily check now
    RunOnce,
    /// Schedule the daily check and run until interrupted
    Start,
}

pub async fn run(action: WorkerAction) -> super::CliResult {
    let config = Config::load()?;
    let store = super::open_store()?;
    let budget = config.reminder.budget();

    match action {
        WorkerAction::RunOnce => {
            let engine = StreakEngine::local();
            let report = run_with_budget(
                budget,
                DailyCheck::run(&store, &engine, &LogNotifier, super::now_millis()),
            )
            .await;
            println!("{}", serde_json::to_string(&report)?);
        }
        WorkerAction::Start => {
            let work = PeriodicWork::from(&config.reminder);
            let name = work.name.clone();
            let owner = format!("pid-{}", std::process::id());

            if !store
                .acquire_worker_lease(name.as_str(), owner.as_str(), super::now_millis(), LEASE_TTL_MS)
                .await?
            {
                return Err(format!("worker '{name}' is already running in another process").into());
            }
            let heartbeat = tokio::spawn(renew_lease(store.clone(), name.clone(), owner.clone()));

            let scheduler = WorkScheduler::new(budget);
            let job_store = store.clone();
            let scheduled = scheduler
                .enqueue_unique(work, ExistingWorkPolicy::Keep, move || {
                    let store = job_store.clone();
                    async move {
                        let engine = StreakEngine::local();
                        DailyCheck::run(&store, &engine, &LogNotifier, super::now_millis()).await
                    }
                })
                .await;

            if let Err(err) = scheduled {
                heartbeat.abort();
                store.release_worker_lease(name.as_str(), owner.as_str()).await?;
                return Err(err.into());
            }

            println!("worker '{name}' scheduled; press Ctrl-C to stop");
            let interrupted = tokio::signal::ctrl_c().await;
            scheduler.shutdown().await;
            heartbeat.abort();
            store.release_worker_lease(name.as_str(), owner.as_str()).await?;
            interrupted?;
            info!(%name, "worker stopped");
        }
    }
    Ok(())
}
