//! Campaign data model.
//!
//! - [`CampaignState`]: the per-device record held by the local store
//! - [`CampaignMetadata`]: the creator-owned document in the remote directory
//! - [`Dashboard`]: which dashboard to resume into

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of distinct calendar days a tester must open the app.
pub const STREAK_GOAL: u32 = 14;

/// Which dashboard the device last used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    #[default]
    None,
    Creator,
    Tester,
}

impl Dashboard {
    /// Persisted form: `""`, `"creator"` or `"tester"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dashboard::None => "",
            Dashboard::Creator => "creator",
            Dashboard::Tester => "tester",
        }
    }

    /// Unknown strings read back as [`Dashboard::None`].
    pub fn from_stored(value: &str) -> Self {
        match value {
            "creator" => Dashboard::Creator,
            "tester" => Dashboard::Tester,
            _ => Dashboard::None,
        }
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dashboard::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Durable per-device campaign record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CampaignState {
    /// Empty means no active campaign.
    pub active_campaign_id: String,
    pub target_package_names: BTreeSet<String>,
    /// In `0..=STREAK_GOAL`.
    pub streak_count: u32,
    /// Epoch millis; 0 means never recorded.
    pub last_run_timestamp: i64,
    pub my_created_campaigns: BTreeSet<String>,
    pub last_dashboard: Dashboard,
}

impl CampaignState {
    pub fn has_active_campaign(&self) -> bool {
        !self.active_campaign_id.trim().is_empty()
    }

    /// The package the reminder should launch.
    pub fn target_package(&self) -> Option<&str> {
        self.target_package_names.iter().next().map(String::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.streak_count >= STREAK_GOAL
    }
}

/// Creator-supplied campaign document, keyed by campaign id.
///
/// Field names follow the remote document layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CampaignMetadata {
    #[serde(rename = "campaignId")]
    pub campaign_id: String,
    #[serde(rename = "googleGroupEmail", default)]
    pub google_group_email: String,
    #[serde(rename = "packageName", default)]
    pub package_name: String,
    /// Mirrors `package_name`; kept for readers of the older layout.
    #[serde(default)]
    pub package_names: Vec<String>,
    /// Epoch millis.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub creator_device_id: String,
}

impl CampaignMetadata {
    pub fn new(
        campaign_id: impl Into<String>,
        google_group_email: impl Into<String>,
        package_name: impl Into<String>,
        created_at: i64,
        creator_device_id: impl Into<String>,
    ) -> Self {
        let package_name = package_name.into();
        Self {
            campaign_id: campaign_id.into(),
            google_group_email: google_group_email.into(),
            package_names: vec![package_name.clone()],
            package_name,
            created_at,
            creator_device_id: creator_device_id.into(),
        }
    }
}
