//! Daily streak engine.
//!
//! Pure logic over [`CampaignState`]: decides whether today's reminder is
//! warranted and computes the next state when a tester records a completed
//! run. No I/O; the store applies the results transactionally.
//!
//! Calendar days are compared in the engine's timezone (the device's local
//! zone by default). Nothing about the zone is persisted, so changing the
//! clock or zone between runs can skip or repeat a day.

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignState, STREAK_GOAL};

/// Outcome of a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StreakAction {
    /// The 14-day goal is reached; nothing left to remind about.
    AlreadyComplete,
    /// The device is not bound to a campaign.
    NoActiveCampaign,
    /// A run was already recorded for the current calendar day.
    AlreadyRunToday,
    /// The campaign has no package to launch.
    NoTargetPackage,
    /// Remind the tester to open `target_package`.
    NotifyTester { target_package: String },
}

impl StreakAction {
    pub fn should_notify(&self) -> bool {
        matches!(self, StreakAction::NotifyTester { .. })
    }
}

/// Result of [`StreakEngine::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub action: StreakAction,
    /// Evaluation never changes the record; this is the input state.
    pub next_state: CampaignState,
}

/// Streak rules parameterised by the timezone that defines a calendar day.
#[derive(Debug, Clone)]
pub struct StreakEngine<Tz: TimeZone = Local> {
    tz: Tz,
}

impl StreakEngine<Local> {
    /// Engine using the device's local timezone.
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl Default for StreakEngine<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> StreakEngine<Tz> {
    /// Engine with an explicit timezone.
    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    /// Decide whether a reminder is warranted at `now` (epoch millis).
    ///
    /// Idempotent; safe to call any number of times per day.
    pub fn evaluate(&self, state: &CampaignState, now: i64) -> Evaluation {
        let action = if state.streak_count >= STREAK_GOAL {
            StreakAction::AlreadyComplete
        } else if !state.has_active_campaign() {
            StreakAction::NoActiveCampaign
        } else if self.same_calendar_day(state.last_run_timestamp, now) {
            StreakAction::AlreadyRunToday
        } else {
            match state.target_package() {
                Some(pkg) => StreakAction::NotifyTester {
                    target_package: pkg.to_string(),
                },
                None => StreakAction::NoTargetPackage,
            }
        };

        Evaluation {
            action,
            next_state: state.clone(),
        }
    }

    /// Credit a completed run at `now`.
    ///
    /// The first call on a calendar day sets `last_run_timestamp` and bumps
    /// the streak (capped at [`STREAK_GOAL`]). Later calls on the same day
    /// return the state unchanged.
    pub fn record_completion(&self, state: &CampaignState, now: i64) -> CampaignState {
        if self.same_calendar_day(state.last_run_timestamp, now) {
            return state.clone();
        }
        CampaignState {
            last_run_timestamp: now,
            streak_count: (state.streak_count + 1).min(STREAK_GOAL),
            ..state.clone()
        }
    }

    /// Zero the streak, leaving everything else alone.
    pub fn reset_streak(&self, state: &CampaignState) -> CampaignState {
        CampaignState {
            streak_count: 0,
            ..state.clone()
        }
    }

    /// Equal (year, day-of-year) in the engine's timezone.
    ///
    /// `t1 == 0` means "never recorded" and is never the same day.
    pub fn same_calendar_day(&self, t1: i64, t2: i64) -> bool {
        if t1 == 0 {
            return false;
        }
        match (self.to_local(t1), self.to_local(t2)) {
            (Some(a), Some(b)) => a.year() == b.year() && a.ordinal() == b.ordinal(),
            _ => false,
        }
    }

    fn to_local(&self, millis: i64) -> Option<DateTime<Tz>> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&self.tz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::FixedOffset;
    use proptest::prelude::*;

    const DAY_MS: i64 = 86_400_000;
    // 2025-03-10T00:00:00Z
    const MONDAY: i64 = 1_741_564_800_000;

    fn engine() -> StreakEngine<Utc> {
        StreakEngine::with_timezone(Utc)
    }

    fn eligible(streak: u32, last_run: i64) -> CampaignState {
        CampaignState {
            active_campaign_id: "X".into(),
            target_package_names: ["com.app".to_string()].into(),
            streak_count: streak,
            last_run_timestamp: last_run,
            ..Default::default()
        }
    }

    #[test]
    fn yesterday_run_notifies_today() {
        let state = eligible(3, MONDAY + 10 * 3_600_000);
        let now = MONDAY + DAY_MS + 9 * 3_600_000;

        let eval = engine().evaluate(&state, now);
        assert_eq!(
            eval.action,
            StreakAction::NotifyTester {
                target_package: "com.app".into()
            }
        );
        assert_eq!(eval.next_state, state);
    }

    #[test]
    fn same_day_run_is_already_run_today() {
        let state = eligible(3, MONDAY + 1_000);
        let now = MONDAY + DAY_MS - 1;
        assert_eq!(engine().evaluate(&state, now).action, StreakAction::AlreadyRunToday);
    }

    #[test]
    fn empty_packages_yield_no_target_package() {
        let mut state = eligible(3, 0);
        state.target_package_names.clear();
        assert_eq!(engine().evaluate(&state, MONDAY).action, StreakAction::NoTargetPackage);
    }

    #[test]
    fn no_campaign_checked_before_timestamp() {
        let mut state = eligible(3, MONDAY);
        state.active_campaign_id.clear();
        assert_eq!(engine().evaluate(&state, MONDAY).action, StreakAction::NoActiveCampaign);
    }

    #[test]
    fn reset_then_first_day_is_eligible() {
        let e = engine();
        let state = e.reset_streak(&eligible(9, 0));
        assert_eq!(state.streak_count, 0);
        assert!(e.evaluate(&state, MONDAY).action.should_notify());
    }

    #[test]
    fn first_completion_counts() {
        let next = engine().record_completion(&eligible(0, 0), MONDAY);
        assert_eq!(next.streak_count, 1);
        assert_eq!(next.last_run_timestamp, MONDAY);
    }

    #[test]
    fn completion_caps_at_goal() {
        let next = engine().record_completion(&eligible(STREAK_GOAL, MONDAY), MONDAY + DAY_MS);
        assert_eq!(next.streak_count, STREAK_GOAL);
        assert_eq!(next.last_run_timestamp, MONDAY + DAY_MS);
    }

    #[test]
    fn day_boundary_follows_engine_timezone() {
        // 23:30 UTC and 00:30 UTC next day are both "Tuesday" at UTC+2.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let e = StreakEngine::with_timezone(tz);
        let late = MONDAY + DAY_MS - 30 * 60_000;
        let early = MONDAY + DAY_MS + 30 * 60_000;
        assert!(e.same_calendar_day(late, early));
        assert!(!engine().same_calendar_day(late, early));
    }

    #[test]
    fn year_boundary_is_a_new_day() {
        // 2024-12-31T12:00Z and 2025-01-01T12:00Z share no (year, ordinal).
        let dec31 = 1_735_646_400_000;
        assert!(!engine().same_calendar_day(dec31, dec31 + DAY_MS));
    }

    #[test]
    fn timezone_shift_can_repeat_a_day() {
        // Known limitation: the same instant pair is one day in one zone and
        // two days in another, so moving zones can double-count.
        let t1 = MONDAY + 23 * 3_600_000;
        let t2 = MONDAY + 25 * 3_600_000;
        let west = StreakEngine::with_timezone(FixedOffset::west_opt(3 * 3600).unwrap());
        assert!(west.same_calendar_day(t1, t2));
        assert!(!engine().same_calendar_day(t1, t2));
    }

    proptest! {
        #[test]
        fn complete_streak_never_notifies(
            streak in STREAK_GOAL..100u32,
            last in 0i64..4_000_000_000_000,
            now in 0i64..4_000_000_000_000,
        ) {
            let state = eligible(streak, last);
            prop_assert_eq!(engine().evaluate(&state, now).action, StreakAction::AlreadyComplete);
        }

        #[test]
        fn same_day_completion_is_noop(
            streak in 0u32..=STREAK_GOAL,
            day in 1i64..40_000,
            a in 0i64..DAY_MS,
            b in 0i64..DAY_MS,
        ) {
            let state = eligible(streak, day * DAY_MS + a);
            let next = engine().record_completion(&state, day * DAY_MS + b);
            prop_assert_eq!(next.streak_count, streak);
        }

        #[test]
        fn new_day_completion_adds_one(
            streak in 0u32..=STREAK_GOAL,
            day in 1i64..40_000,
            gap in 1i64..30,
            a in 0i64..DAY_MS,
            b in 0i64..DAY_MS,
        ) {
            let state = eligible(streak, day * DAY_MS + a);
            let next = engine().record_completion(&state, (day + gap) * DAY_MS + b);
            prop_assert_eq!(next.streak_count, (streak + 1).min(STREAK_GOAL));
        }

        #[test]
        fn repeated_completion_equals_single(
            streak in 0u32..STREAK_GOAL,
            last_day in 1i64..20_000,
            gap in 1i64..30,
            offsets in proptest::collection::vec(0i64..DAY_MS, 2..6),
        ) {
            let e = engine();
            let start = eligible(streak, last_day * DAY_MS);
            let today = (last_day + gap) * DAY_MS;
            let once = e.record_completion(&start, today + offsets[0]);
            let mut many = start.clone();
            for off in &offsets {
                many = e.record_completion(&many, today + off);
            }
            prop_assert_eq!(once, many);
        }
    }
}
