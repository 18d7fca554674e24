//! End-to-end campaign flow against an in-memory directory and store.
//!
//! A creator registers a campaign, a tester onboards from the join link,
//! the daily check reminds them, and fourteen daily check-ins complete
//! the streak.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use launchloop_core::directory::CampaignDirectory;
use launchloop_core::trigger::NotifyError;
use launchloop_core::{
    parse_join_link, start_destination, CampaignService, CampaignStore, DailyCheck, Dashboard,
    Destination, MemoryDirectory, Notifier, OnboardingSequencer, Reminder, StreakAction,
    StreakEngine, TesterView, TickReport, STREAK_GOAL,
};

const DAY_MS: i64 = 86_400_000;
const MONDAY: i64 = 1_741_564_800_000;
const HOST: &str = "baijum.github.io";

#[derive(Default)]
struct Inbox(Mutex<Vec<Reminder>>);

#[async_trait]
impl Notifier for Inbox {
    async fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(reminder.clone());
        Ok(())
    }
}

#[tokio::test]
async fn creator_to_completed_streak() {
    let directory = MemoryDirectory::new();

    // Creator device
    let creator_store = CampaignStore::open_in_memory().unwrap();
    let service = CampaignService::new(
        Arc::new(directory.clone()),
        creator_store.clone(),
        "launchloop-creator",
        HOST,
    );
    let meta = service
        .create_campaign("testers@googlegroups.com", "com.example.app", MONDAY)
        .await
        .unwrap();
    let link = service.join_link(&meta.campaign_id);

    // Tester device
    let tester_store = CampaignStore::open_in_memory().unwrap();
    let campaign_id = parse_join_link(&link, HOST).unwrap();
    assert_eq!(
        start_destination(Some(&campaign_id), Dashboard::None),
        Destination::Onboarding(meta.campaign_id.clone())
    );

    let mut onboarding = OnboardingSequencer::load(&directory, &campaign_id).await;
    assert_eq!(onboarding.progress().package_name, "com.example.app");
    onboarding.advance();
    onboarding.advance();
    onboarding.finish(&tester_store).await.unwrap();

    let state = tester_store.snapshot();
    assert_eq!(state.last_dashboard, Dashboard::Tester);
    assert_eq!(
        start_destination(None, state.last_dashboard),
        Destination::TesterDashboard
    );

    let engine = StreakEngine::with_timezone(Utc);
    let inbox = Inbox::default();

    for day in 0..STREAK_GOAL as i64 {
        let morning = MONDAY + day * DAY_MS + 8 * 3_600_000;
        let report = DailyCheck::run(&tester_store, &engine, &inbox, morning).await;
        assert!(matches!(
            report,
            TickReport::Evaluated {
                action: StreakAction::NotifyTester { .. }
            }
        ));

        tester_store
            .record_completion(&engine, morning + 60_000)
            .await
            .unwrap();
        // A second check-in the same day earns nothing.
        tester_store
            .record_completion(&engine, morning + 120_000)
            .await
            .unwrap();
        assert_eq!(tester_store.snapshot().streak_count, day as u32 + 1);
    }

    let view = TesterView::from_state(&tester_store.snapshot());
    assert!(view.is_complete);
    assert_eq!(view.progress, 1.0);
    assert_eq!(inbox.0.lock().unwrap().len(), STREAK_GOAL as usize);

    let after = DailyCheck::run(
        &tester_store,
        &engine,
        &inbox,
        MONDAY + 20 * DAY_MS,
    )
    .await;
    assert_eq!(
        after,
        TickReport::Evaluated {
            action: StreakAction::AlreadyComplete
        }
    );
}

#[tokio::test]
async fn deleted_campaign_cannot_be_joined() {
    let directory = MemoryDirectory::new();
    let store = CampaignStore::open_in_memory().unwrap();
    let service = CampaignService::new(
        Arc::new(directory.clone()),
        store.clone(),
        "launchloop-creator",
        HOST,
    );
    let meta = service
        .create_campaign("g@googlegroups.com", "com.app", MONDAY)
        .await
        .unwrap();
    service.delete_campaign(&meta.campaign_id).await.unwrap();

    assert_eq!(directory.get(&meta.campaign_id).await.unwrap(), None);
    let onboarding = OnboardingSequencer::load(&directory, &meta.campaign_id).await;
    assert_eq!(onboarding.progress().error(), Some("Campaign not found"));
}

#[tokio::test]
async fn skipped_day_does_not_reset_streak() {
    let store = CampaignStore::open_in_memory().unwrap();
    let engine = StreakEngine::with_timezone(Utc);
    store.bind_campaign("ABCD1234", "com.app").await.unwrap();

    store.record_completion(&engine, MONDAY).await.unwrap();
    store
        .record_completion(&engine, MONDAY + 3 * DAY_MS)
        .await
        .unwrap();
    assert_eq!(store.snapshot().streak_count, 2);
}
