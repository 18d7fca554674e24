//! Periodic daily-check trigger.
//!
//! [`DailyCheck`] is the stateless tick handler: it evaluates the committed
//! campaign record and posts a reminder when one is warranted. The
//! [`scheduler`] runs it roughly once a day. Failures inside a tick are
//! reported as a [`TickReport::Failed`] value and never escape.

pub mod scheduler;

use async_trait::async_trait;
use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::CampaignStore;
use crate::streak::{StreakAction, StreakEngine};

pub use scheduler::{ExistingWorkPolicy, PeriodicWork, ScheduleError, WorkScheduler};

pub const REMINDER_TITLE: &str = "Time for your daily test run";
pub const REMINDER_BODY: &str = "Tap to open and test the app.";

/// User-visible reminder for today's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Package the reminder opens when tapped.
    pub target_package: String,
    pub title: String,
    pub body: String,
}

impl Reminder {
    pub fn for_package(target_package: impl Into<String>) -> Self {
        Self {
            target_package: target_package.into(),
            title: REMINDER_TITLE.into(),
            body: REMINDER_BODY.into(),
        }
    }
}

/// Failure to deliver a reminder.
#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers reminders to the tester.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used by the CLI worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        info!(
            package = %reminder.target_package,
            title = %reminder.title,
            body = %reminder.body,
            "reminder posted"
        );
        Ok(())
    }
}

/// Outcome of one background tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickReport {
    Evaluated { action: StreakAction },
    Failed { reason: String },
}

impl TickReport {
    pub fn is_failure(&self) -> bool {
        matches!(self, TickReport::Failed { .. })
    }
}

/// The daily check itself.
pub struct DailyCheck;

impl DailyCheck {
    /// Evaluate the record as stored on disk at `now` and notify if
    /// warranted.
    ///
    /// Never advances the streak; credit comes only from an explicit
    /// check-in.
    pub async fn run<Tz: TimeZone>(
        store: &CampaignStore,
        engine: &StreakEngine<Tz>,
        notifier: &dyn Notifier,
        now: i64,
    ) -> TickReport {
        let state = match store.reload().await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "daily check could not read campaign state");
                return TickReport::Failed {
                    reason: err.to_string(),
                };
            }
        };
        let action = engine.evaluate(&state, now).action;
        debug!(?action, "daily check evaluated");

        if let StreakAction::NotifyTester { target_package } = &action {
            let reminder = Reminder::for_package(target_package.clone());
            if let Err(err) = notifier.notify(&reminder).await {
                warn!(error = %err, "daily check failed");
                return TickReport::Failed {
                    reason: err.to_string(),
                };
            }
        }
        TickReport::Evaluated { action }
    }
}
