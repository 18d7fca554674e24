//! Creator-side campaign management.
//!
//! Creation writes the remote document first and records the id locally
//! only after that succeeds; deletion removes the remote document first.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::campaign::CampaignMetadata;
use crate::directory::CampaignDirectory;
use crate::error::{Result, ValidationError};
use crate::join_link;
use crate::storage::CampaignStore;

/// Length of a generated campaign id.
pub const CAMPAIGN_ID_LEN: usize = 8;

/// Attempts at finding an unused id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Campaign create/delete/list for the creator dashboard.
#[derive(Clone)]
pub struct CampaignService {
    directory: Arc<dyn CampaignDirectory>,
    store: CampaignStore,
    device_id: String,
    link_host: String,
}

impl CampaignService {
    pub fn new(
        directory: Arc<dyn CampaignDirectory>,
        store: CampaignStore,
        device_id: impl Into<String>,
        link_host: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            store,
            device_id: device_id.into(),
            link_host: link_host.into(),
        }
    }

    /// Register a new campaign and remember it as created by this device.
    ///
    /// # Errors
    /// Validation errors for blank input or an exhausted id space; remote
    /// errors leave the local record untouched.
    pub async fn create_campaign(
        &self,
        group_email: &str,
        package_name: &str,
        now: i64,
    ) -> Result<CampaignMetadata> {
        let group_email = group_email.trim();
        let package_name = package_name.trim();
        if group_email.is_empty() || package_name.is_empty() {
            return Err(ValidationError::Blank("Both fields are required.".into()).into());
        }

        let campaign_id = self.unused_campaign_id().await?;
        let metadata = CampaignMetadata::new(
            campaign_id,
            group_email,
            package_name,
            now,
            self.device_id.clone(),
        );

        self.directory.put(&metadata).await?;
        self.store
            .add_created_campaign(metadata.campaign_id.clone())
            .await?;
        info!(id = %metadata.campaign_id, package = %metadata.package_name, "campaign created");
        Ok(metadata)
    }

    /// Delete a campaign remotely, then forget it locally.
    pub async fn delete_campaign(&self, campaign_id: &str) -> Result<()> {
        let campaign_id = campaign_id.trim();
        if campaign_id.is_empty() {
            return Err(ValidationError::InvalidCampaignId(campaign_id.to_string()).into());
        }
        self.directory.delete(campaign_id).await?;
        self.store.remove_created_campaign(campaign_id).await?;
        info!(id = %campaign_id, "campaign deleted");
        Ok(())
    }

    /// Campaigns created on this device, resolved against the directory.
    ///
    /// A lookup that fails or finds nothing yields an entry carrying only
    /// the id.
    pub async fn my_campaigns(&self) -> Vec<CampaignMetadata> {
        let ids = self.store.snapshot().my_created_campaigns;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let item = match self.directory.get(&id).await {
                Ok(Some(meta)) => meta,
                Ok(None) => CampaignMetadata {
                    campaign_id: id,
                    ..Default::default()
                },
                Err(err) => {
                    warn!(%id, error = %err, "campaign lookup failed");
                    CampaignMetadata {
                        campaign_id: id,
                        ..Default::default()
                    }
                }
            };
            items.push(item);
        }
        items
    }

    /// Share link for `campaign_id`.
    pub fn join_link(&self, campaign_id: &str) -> String {
        join_link::join_link(&self.link_host, campaign_id)
    }

    async fn unused_campaign_id(&self) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = generate_campaign_id();
            if self.directory.get(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            warn!(id = %candidate, "campaign id already taken, regenerating");
        }
        Err(ValidationError::IdSpaceExhausted(MAX_ID_ATTEMPTS).into())
    }
}

/// Eight uppercase hex characters taken from a random UUID.
pub fn generate_campaign_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(CAMPAIGN_ID_LEN)
        .collect::<String>()
        .to_uppercase()
}
