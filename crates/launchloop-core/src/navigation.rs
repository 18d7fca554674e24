//! Start-up routing between the role chooser and the two dashboards.

use serde::{Deserialize, Serialize};

use crate::campaign::Dashboard;

/// Screen to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "destination", content = "campaign_id", rename_all = "snake_case")]
pub enum Destination {
    RoleChooser,
    CreatorDashboard,
    TesterDashboard,
    Onboarding(String),
}

/// Pick the first screen: a deep-linked campaign wins, then the last used
/// dashboard, otherwise the role chooser.
pub fn start_destination(deep_link_campaign: Option<&str>, last_dashboard: Dashboard) -> Destination {
    if let Some(id) = deep_link_campaign.map(str::trim).filter(|id| !id.is_empty()) {
        return Destination::Onboarding(id.to_string());
    }
    match last_dashboard {
        Dashboard::Creator => Destination::CreatorDashboard,
        Dashboard::Tester => Destination::TesterDashboard,
        Dashboard::None => Destination::RoleChooser,
    }
}
