//! Remote campaign directory.
//!
//! Creator-owned [`CampaignMetadata`] documents keyed by campaign id. The
//! core only needs get, put and delete; there is no automatic retry, and
//! concurrent writers resolve last-write-wins.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;

use crate::campaign::CampaignMetadata;
use crate::error::RemoteError;

pub use firestore::FirestoreDirectory;
pub use memory::MemoryDirectory;

/// Document store holding campaign metadata.
#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    /// Fetch a campaign. `Ok(None)` when no document exists for `id`.
    async fn get(&self, id: &str) -> Result<Option<CampaignMetadata>, RemoteError>;

    /// Create or replace the document for `metadata.campaign_id`.
    async fn put(&self, metadata: &CampaignMetadata) -> Result<(), RemoteError>;

    /// Delete a campaign. Deleting a missing document is not an error.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}
