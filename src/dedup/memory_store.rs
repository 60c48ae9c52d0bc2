//! In-process `AssetStore` test double, guarded by an `RwLock` so it can be
//! shared across concurrent source pipelines in tests.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{AssetStore, StoredHost};
use crate::domain::UnifiedHost;
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryAssetStore {
    records: RwLock<Vec<StoredHost>>,
}

impl InMemoryAssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_candidates(&self, probe: &UnifiedHost) -> Result<Vec<StoredHost>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|stored| {
                matches_field(&probe.primary_mac_address, &stored.host.primary_mac_address)
                    || matches_field(&probe.cloud_instance_id, &stored.host.cloud_instance_id)
                    || matches_field(&probe.hostname, &stored.host.hostname)
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, host: UnifiedHost) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.records.write().await.push(StoredHost { id: id.clone(), host });
        Ok(id)
    }

    async fn replace(&self, id: &str, host: UnifiedHost) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| StoreError::Io(format!("no stored record with id {id}")))?;
        slot.host = host;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StoredHost>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}

fn matches_field(probe: &Option<String>, stored: &Option<String>) -> bool {
    matches!((probe, stored), (Some(a), Some(b)) if a == b)
}
