//! In-process campaign directory for tests and offline use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::CampaignDirectory;
use crate::campaign::CampaignMetadata;
use crate::error::RemoteError;

#[derive(Default)]
struct Shared {
    docs: HashMap<String, CampaignMetadata>,
    fail_with: Option<RemoteError>,
}

/// Map-backed directory. Clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `err` until cleared.
    pub fn fail_with(&self, err: Option<RemoteError>) {
        self.lock().fail_with = err;
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panicking test thread must not wedge the others.
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<MutexGuard<'_, Shared>, RemoteError> {
        let guard = self.lock();
        if let Some(err) = guard.fail_with.clone() {
            return Err(err);
        }
        Ok(guard)
    }
}

#[async_trait]
impl CampaignDirectory for MemoryDirectory {
    async fn get(&self, id: &str) -> Result<Option<CampaignMetadata>, RemoteError> {
        Ok(self.check()?.docs.get(id).cloned())
    }

    async fn put(&self, metadata: &CampaignMetadata) -> Result<(), RemoteError> {
        self.check()?
            .docs
            .insert(metadata.campaign_id.clone(), metadata.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.check()?.docs.remove(id);
        Ok(())
    }
}
