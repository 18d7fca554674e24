//! Read model for the tester dashboard.

use serde::Serialize;
use tokio::sync::watch;

use crate::campaign::{CampaignState, STREAK_GOAL};
use crate::storage::CampaignStore;

/// What the tester dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TesterView {
    pub campaign_id: String,
    pub target_package: String,
    pub streak: u32,
    pub goal: u32,
    pub is_complete: bool,
    pub has_active_campaign: bool,
    /// `streak / goal`, in `0.0..=1.0`.
    pub progress: f64,
}

impl TesterView {
    pub fn from_state(state: &CampaignState) -> Self {
        Self {
            campaign_id: state.active_campaign_id.clone(),
            target_package: state.target_package().unwrap_or_default().to_string(),
            streak: state.streak_count,
            goal: STREAK_GOAL,
            is_complete: state.is_complete(),
            has_active_campaign: state.has_active_campaign(),
            progress: f64::from(state.streak_count.min(STREAK_GOAL)) / f64::from(STREAK_GOAL),
        }
    }

    /// Follow the store, yielding a fresh view after every commit.
    pub fn watch(store: &CampaignStore) -> TesterViewStream {
        TesterViewStream {
            rx: store.subscribe(),
        }
    }
}

/// Views derived from store commits. Dropping it unsubscribes.
pub struct TesterViewStream {
    rx: watch::Receiver<CampaignState>,
}

impl TesterViewStream {
    /// View of the latest commit.
    pub fn current(&mut self) -> TesterView {
        TesterView::from_state(&self.rx.borrow_and_update())
    }

    /// Wait for the next commit. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<TesterView> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_view() {
        let view = TesterView::from_state(&CampaignState::default());
        assert_eq!(view.campaign_id, "");
        assert_eq!(view.target_package, "");
        assert!(!view.has_active_campaign);
        assert!(!view.is_complete);
        assert_eq!(view.progress, 0.0);
    }

    #[test]
    fn completed_streak_view() {
        let state = CampaignState {
            active_campaign_id: "ABCD1234".into(),
            target_package_names: ["com.app".to_string()].into(),
            streak_count: STREAK_GOAL,
            ..Default::default()
        };
        let view = TesterView::from_state(&state);
        assert!(view.is_complete);
        assert_eq!(view.target_package, "com.app");
        assert_eq!(view.progress, 1.0);
    }

    #[tokio::test]
    async fn watch_follows_commits() {
        let store = CampaignStore::open_in_memory().unwrap();
        let mut views = TesterView::watch(&store);
        assert!(!views.current().has_active_campaign);

        store.bind_campaign("ABCD1234", "com.app").await.unwrap();
        let view = views.next().await.unwrap();
        assert_eq!(view.campaign_id, "ABCD1234");
        assert_eq!(view.streak, 0);

        store.increment_streak().await.unwrap();
        assert_eq!(views.next().await.unwrap().streak, 1);
    }
}
