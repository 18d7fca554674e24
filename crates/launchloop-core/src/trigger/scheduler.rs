//! Tokio-backed periodic work registry.
//!
//! One task per unique work name. The first run fires one interval minus
//! the flex window after registration, then every interval. Each run is
//! bounded by the scheduler's time budget.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::TickReport;
use crate::storage::ReminderConfig;

/// A recurring unit of background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicWork {
    pub name: String,
    pub interval: Duration,
    /// Early-run window; the first run happens at `interval - flex`.
    pub flex: Duration,
}

impl Default for PeriodicWork {
    fn default() -> Self {
        Self::from(&ReminderConfig::default())
    }
}

impl From<&ReminderConfig> for PeriodicWork {
    fn from(cfg: &ReminderConfig) -> Self {
        Self {
            name: cfg.work_name.clone(),
            interval: cfg.interval(),
            flex: cfg.flex(),
        }
    }
}

impl PeriodicWork {
    pub fn first_delay(&self) -> Duration {
        self.interval.saturating_sub(self.flex)
    }
}

/// Work that cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("periodic work '{0}' has a zero interval")]
    ZeroInterval(String),

    #[error("periodic work '{0}' has an interval too large to schedule")]
    IntervalTooLarge(String),
}

/// What to do when work with the same name is already scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingWorkPolicy {
    /// Leave the running schedule untouched.
    #[default]
    Keep,
    /// Cancel it and start over.
    Replace,
}

/// Registry of scheduled periodic work.
#[derive(Clone)]
pub struct WorkScheduler {
    tasks: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    budget: Duration,
}

impl WorkScheduler {
    /// `budget` bounds a single run.
    pub fn new(budget: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            budget,
        }
    }

    /// Schedule `job` under `work.name`.
    ///
    /// Returns `Ok(false)` when `Keep` found live work with that name.
    ///
    /// # Errors
    /// A zero interval, or one that overflows the clock, is rejected before
    /// anything is scheduled.
    pub async fn enqueue_unique<F, Fut>(
        &self,
        work: PeriodicWork,
        policy: ExistingWorkPolicy,
        job: F,
    ) -> Result<bool, ScheduleError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TickReport> + Send + 'static,
    {
        if work.interval.is_zero() {
            return Err(ScheduleError::ZeroInterval(work.name));
        }
        let start = Instant::now()
            .checked_add(work.first_delay())
            .filter(|start| start.checked_add(work.interval).is_some())
            .ok_or_else(|| ScheduleError::IntervalTooLarge(work.name.clone()))?;

        let mut tasks = self.tasks.lock().await;
        if let Some(existing) = tasks.get(&work.name) {
            if policy == ExistingWorkPolicy::Keep && !existing.is_finished() {
                debug!(name = %work.name, "periodic work already scheduled, keeping");
                return Ok(false);
            }
            existing.abort();
        }

        let budget = self.budget;
        let name = work.name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(start, work.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let report = run_with_budget(budget, job()).await;
                match &report {
                    TickReport::Evaluated { action } => {
                        info!(name = %work.name, ?action, "periodic work ran")
                    }
                    TickReport::Failed { reason } => {
                        warn!(name = %work.name, %reason, "periodic work failed")
                    }
                }
            }
        });

        info!(%name, ?policy, "periodic work scheduled");
        tasks.insert(name, handle);
        Ok(true)
    }

    /// Stop the named work. Returns whether anything was scheduled.
    pub async fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().await.remove(name) {
            Some(handle) => {
                handle.abort();
                info!(%name, "periodic work cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .await
            .get(name)
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop everything.
    pub async fn shutdown(&self) {
        for (name, handle) in self.tasks.lock().await.drain() {
            debug!(%name, "stopping periodic work");
            handle.abort();
        }
    }
}

/// Run one tick, reporting a timeout as a failed tick.
pub async fn run_with_budget<Fut>(budget: Duration, tick: Fut) -> TickReport
where
    Fut: Future<Output = TickReport>,
{
    match time::timeout(budget, tick).await {
        Ok(report) => report,
        Err(_) => TickReport::Failed {
            reason: format!("tick exceeded its {}s budget", budget.as_secs()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::streak::StreakAction;

    const HOUR: Duration = Duration::from_secs(3600);

    fn counting_job(
        count: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<TickReport> + Send + Sync + 'static {
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(TickReport::Evaluated {
                action: StreakAction::NoActiveCampaign,
            })
        }
    }

    #[test]
    fn default_work_is_daily_with_hour_flex() {
        let work = PeriodicWork::default();
        assert_eq!(work.name, "daily_test_work");
        assert_eq!(work.interval, 24 * HOUR);
        assert_eq!(work.flex, HOUR);
        assert_eq!(work.first_delay(), 23 * HOUR);
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_waits_interval_minus_flex() {
        let scheduler = WorkScheduler::new(Duration::from_secs(60));
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .enqueue_unique(
                PeriodicWork::default(),
                ExistingWorkPolicy::Keep,
                counting_job(count.clone()),
            )
            .await
            .unwrap();

        time::sleep(22 * HOUR).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        time::sleep(24 * HOUR).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keep_policy_is_idempotent() {
        let scheduler = WorkScheduler::new(Duration::from_secs(60));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(scheduler
            .enqueue_unique(
                PeriodicWork::default(),
                ExistingWorkPolicy::Keep,
                counting_job(first.clone()),
            )
            .await
            .unwrap());
        assert!(!scheduler
            .enqueue_unique(
                PeriodicWork::default(),
                ExistingWorkPolicy::Keep,
                counting_job(second.clone()),
            )
            .await
            .unwrap());

        time::sleep(24 * HOUR).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_policy_swaps_the_job() {
        let scheduler = WorkScheduler::new(Duration::from_secs(60));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler
            .enqueue_unique(
                PeriodicWork::default(),
                ExistingWorkPolicy::Keep,
                counting_job(first.clone()),
            )
            .await
            .unwrap();
        assert!(scheduler
            .enqueue_unique(
                PeriodicWork::default(),
                ExistingWorkPolicy::Replace,
                counting_job(second.clone()),
            )
            .await
            .unwrap());

        time::sleep(24 * HOUR).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_unschedules() {
        let scheduler = WorkScheduler::new(Duration::from_secs(60));
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .enqueue_unique(
                PeriodicWork::default(),
                ExistingWorkPolicy::Keep,
                counting_job(count),
            )
            .await
            .unwrap();

        assert!(scheduler.is_scheduled("daily_test_work").await);
        assert!(scheduler.cancel("daily_test_work").await);
        assert!(!scheduler.is_scheduled("daily_test_work").await);
        assert!(!scheduler.cancel("daily_test_work").await);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected_up_front() {
        let scheduler = WorkScheduler::new(Duration::from_secs(60));
        let count = Arc::new(AtomicUsize::new(0));
        let work = PeriodicWork {
            interval: Duration::ZERO,
            flex: Duration::ZERO,
            ..PeriodicWork::default()
        };

        let result = scheduler
            .enqueue_unique(work, ExistingWorkPolicy::Keep, counting_job(count.clone()))
            .await;
        assert_eq!(result, Err(ScheduleError::ZeroInterval("daily_test_work".into())));
        assert!(!scheduler.is_scheduled("daily_test_work").await);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrepresentable_interval_is_rejected() {
        let scheduler = WorkScheduler::new(Duration::from_secs(60));
        let work = PeriodicWork {
            interval: Duration::MAX,
            flex: Duration::ZERO,
            ..PeriodicWork::default()
        };

        let result = scheduler
            .enqueue_unique(
                work,
                ExistingWorkPolicy::Keep,
                counting_job(Arc::new(AtomicUsize::new(0))),
            )
            .await;
        assert!(matches!(result, Err(ScheduleError::IntervalTooLarge(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_tick_is_reported_failed() {
        let report = run_with_budget(Duration::from_secs(5), async {
            time::sleep(Duration::from_secs(60)).await;
            TickReport::Evaluated {
                action: StreakAction::NoActiveCampaign,
            }
        })
        .await;
        assert!(report.is_failure());
    }
}
