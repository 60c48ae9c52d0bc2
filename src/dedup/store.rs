//! The `AssetStore` abstraction.
//!
//! The real document store is an out-of-scope external collaborator;
//! this trait is the interface this crate depends on instead of any
//! concrete driver. `SqliteAssetStore` is a production-shaped
//! implementation; `InMemoryAssetStore` is a test double.

use async_trait::async_trait;

use crate::domain::UnifiedHost;
use crate::error::StoreError;

/// A stored record plus the identifier the store uses to address it for an
/// update. Opaque to callers outside this module.
#[derive(Debug, Clone)]
pub struct StoredHost {
    pub id: String,
    pub host: UnifiedHost,
}

/// The document-store contract the deduplicator depends on.
///
/// Named `unified_assets` / `asset_inventory`, though the concrete
/// collection/database names are an implementation detail of each backend.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Ensures the sparse secondary indexes on the five match fields exist.
    /// Idempotent; called once at pipeline startup.
    async fn ensure_indexes(&self) -> Result<(), StoreError>;

    /// Returns every stored record whose `primary_mac_address`,
    /// `cloud_instance_id`, or `hostname` equals the corresponding non-null
    /// field on `probe`. Candidates are returned in a stable, deterministic
    /// order for a given store state.
    async fn find_candidates(&self, probe: &UnifiedHost) -> Result<Vec<StoredHost>, StoreError>;

    /// Inserts `host` as a brand new record and returns its store id.
    async fn insert(&self, host: UnifiedHost) -> Result<String, StoreError>;

    /// Overwrites the record at `id` with `host` in full.
    async fn replace(&self, id: &str, host: UnifiedHost) -> Result<(), StoreError>;

    /// All stored records, for test assertions and idempotence checks.
    async fn all(&self) -> Result<Vec<StoredHost>, StoreError>;
}
