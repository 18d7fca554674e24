//! Three-step tester onboarding.
//!
//! The sequencer loads a campaign from the directory, walks the tester
//! strictly forward through three confirmation steps, and commits the
//! binding to the local store exactly once. Nothing is written before
//! [`OnboardingSequencer::finish`]; dropping the sequencer abandons the flow.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::campaign::CampaignState;
use crate::directory::CampaignDirectory;
use crate::error::{RemoteError, StorageError};
use crate::storage::CampaignStore;

/// Number of confirmation steps.
pub const TOTAL_STEPS: usize = 3;

/// Where the flow currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "message", rename_all = "snake_case")]
pub enum OnboardingPhase {
    Loading,
    Ready,
    /// Terminal; carries a user-facing message.
    Error(String),
}

/// Ephemeral state of one onboarding flow. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub campaign_id: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub google_group_email: String,
    pub package_name: String,
    pub phase: OnboardingPhase,
}

impl OnboardingProgress {
    fn loading(campaign_id: &str) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            current_step: 0,
            total_steps: TOTAL_STEPS,
            google_group_email: String::new(),
            package_name: String::new(),
            phase: OnboardingPhase::Loading,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            OnboardingPhase::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_final_step(&self) -> bool {
        self.current_step == self.total_steps - 1
    }

    /// Fraction of the flow reached, counting the current step.
    pub fn fraction(&self) -> f64 {
        (self.current_step + 1) as f64 / self.total_steps as f64
    }

    /// Descriptor for the current step.
    pub fn step(&self) -> OnboardingStep {
        OnboardingStep::describe(self.current_step, &self.google_group_email, &self.package_name)
    }
}

/// What the tester is asked to do on one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStep {
    pub index: usize,
    pub title: String,
    pub description: String,
    /// Group email on the first step, package name afterwards.
    pub detail: String,
    /// External page the tester opens to complete the step.
    pub action_url: String,
    /// Label of the confirm/continue action.
    pub confirm_label: String,
}

impl OnboardingStep {
    pub fn describe(index: usize, group_email: &str, package: &str) -> Self {
        match index {
            0 => {
                let group = group_email.split('@').next().unwrap_or_default();
                Self {
                    index,
                    title: "Step 1: Join Google Group".into(),
                    description: "Join the testing Google Group to become an eligible tester."
                        .into(),
                    detail: group_email.to_string(),
                    action_url: format!("https://groups.google.com/g/{group}"),
                    confirm_label: "I've Joined, Next".into(),
                }
            }
            1 => Self {
                index,
                title: "Step 2: Opt In to Testing".into(),
                description:
                    "Open the Google Play testing opt-in link to join the closed test track."
                        .into(),
                detail: package.to_string(),
                action_url: format!("https://play.google.com/apps/testing/{package}"),
                confirm_label: "I've Opted In, Next".into(),
            },
            _ => Self {
                index,
                title: "Step 3: Download the App".into(),
                description: "Install the app from the Google Play Store. It may take a few \
                              minutes to appear after opting in."
                    .into(),
                detail: package.to_string(),
                action_url: format!("https://play.google.com/store/apps/details?id={package}"),
                confirm_label: "Finish Setup".into(),
            },
        }
    }
}

/// Error type for onboarding operations.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// The campaign never loaded (still loading or failed).
    #[error("onboarding is not ready: {0}")]
    NotReady(String),

    /// `finish` called before the last step.
    #[error("onboarding is on step {current} of {total}; finish is only valid on the last step")]
    NotAtFinalStep { current: usize, total: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Drives one onboarding flow.
#[derive(Debug)]
pub struct OnboardingSequencer {
    progress: OnboardingProgress,
}

impl OnboardingSequencer {
    /// Fetch the campaign and start at step 0, or end in a terminal error.
    pub async fn load(directory: &dyn CampaignDirectory, campaign_id: &str) -> Self {
        let mut progress = OnboardingProgress::loading(campaign_id);

        match directory.get(campaign_id).await {
            Ok(Some(meta)) => {
                progress.google_group_email = meta.google_group_email;
                progress.package_name = meta.package_name;
                progress.phase = OnboardingPhase::Ready;
                info!(%campaign_id, "onboarding ready");
            }
            Ok(None) | Err(RemoteError::NotFound(_)) => {
                progress.phase = OnboardingPhase::Error("Campaign not found".into());
            }
            Err(err) => {
                warn!(%campaign_id, error = %err, "failed to load campaign");
                progress.phase = OnboardingPhase::Error(err.to_string());
            }
        }

        Self { progress }
    }

    pub fn progress(&self) -> &OnboardingProgress {
        &self.progress
    }

    /// Move one step forward. A no-op on the last step or outside `Ready`.
    pub fn advance(&mut self) -> &OnboardingProgress {
        if self.progress.phase == OnboardingPhase::Ready
            && self.progress.current_step < self.progress.total_steps - 1
        {
            self.progress.current_step += 1;
        }
        &self.progress
    }

    /// Commit the campaign binding and end the flow.
    ///
    /// Writes the active campaign, its package, a zero streak and a cleared
    /// run timestamp as one transaction.
    pub async fn finish(self, store: &CampaignStore) -> Result<CampaignState, OnboardingError> {
        match &self.progress.phase {
            OnboardingPhase::Ready => {}
            OnboardingPhase::Loading => return Err(OnboardingError::NotReady("loading".into())),
            OnboardingPhase::Error(msg) => return Err(OnboardingError::NotReady(msg.clone())),
        }
        if !self.progress.is_final_step() {
            return Err(OnboardingError::NotAtFinalStep {
                current: self.progress.current_step,
                total: self.progress.total_steps,
            });
        }

        let OnboardingProgress {
            campaign_id,
            package_name,
            ..
        } = self.progress;
        let state = store.bind_campaign(campaign_id.clone(), package_name).await?;
        info!(%campaign_id, "onboarding finished");
        Ok(state)
    }
}
