//! # LaunchLoop Core Library
//!
//! Core logic for LaunchLoop, a coordinator for closed app tests: creators
//! register an app under test, testers join through a three-step onboarding
//! flow and then open the app once per calendar day for fourteen days.
//! The CLI binary is a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Streak Engine**: pure day-boundary rules over the campaign record
//! - **Storage**: SQLite key-value campaign record and TOML configuration
//! - **Directory**: remote campaign documents (Firestore REST or in-memory)
//! - **Trigger**: daily reminder check and its periodic scheduler
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: daily streak evaluation and completion
//! - [`CampaignStore`]: transactional per-device campaign record
//! - [`OnboardingSequencer`]: join-group, opt-in, download flow
//! - [`CampaignDirectory`]: trait for the remote campaign collection
//! - [`CampaignService`]: creator-side create/delete/list
//! - [`DailyCheck`]: the background tick

pub mod campaign;
pub mod campaigns;
pub mod device_id;
pub mod directory;
pub mod error;
pub mod join_link;
pub mod navigation;
pub mod onboarding;
pub mod storage;
pub mod streak;
pub mod tester;
pub mod trigger;

pub use campaign::{CampaignMetadata, CampaignState, Dashboard, STREAK_GOAL};
pub use campaigns::CampaignService;
pub use directory::{CampaignDirectory, FirestoreDirectory, MemoryDirectory};
pub use error::{ConfigError, CoreError, RemoteError, StorageError, ValidationError};
pub use join_link::{join_link, parse_join_link};
pub use navigation::{start_destination, Destination};
pub use onboarding::{OnboardingError, OnboardingProgress, OnboardingSequencer, OnboardingStep};
pub use storage::{CampaignStore, Config};
pub use streak::{Evaluation, StreakAction, StreakEngine};
pub use tester::TesterView;
pub use trigger::{
    DailyCheck, ExistingWorkPolicy, LogNotifier, Notifier, PeriodicWork, Reminder, ScheduleError,
    TickReport, WorkScheduler,
};
