//! `AssetStore` backed by SQLite: one JSON column holding the full canonical
//! record, plus indexed scalar columns for the five match fields, mirroring
//! a document store with secondary indexes.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::store::{AssetStore, StoredHost};
use crate::domain::UnifiedHost;
use crate::error::StoreError;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS unified_assets (
    id TEXT PRIMARY KEY,
    primary_mac_address TEXT,
    cloud_instance_id TEXT,
    hostname TEXT,
    private_ip TEXT,
    public_ip TEXT,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_unified_assets_mac ON unified_assets (primary_mac_address) WHERE primary_mac_address IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_unified_assets_cloud_instance ON unified_assets (cloud_instance_id) WHERE cloud_instance_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_unified_assets_hostname ON unified_assets (hostname) WHERE hostname IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_unified_assets_private_ip ON unified_assets (private_ip) WHERE private_ip IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_unified_assets_public_ip ON unified_assets (public_ip) WHERE public_ip IS NOT NULL;
";

/// `asset_inventory` database, `unified_assets` table.
pub struct SqliteAssetStore {
    pool: SqlitePool,
}

impl SqliteAssetStore {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StoreError::Io(err.to_string()))?;
            }
        }
        if !Path::new(db_path).exists() {
            std::fs::File::create(db_path).map_err(|err| StoreError::Io(err.to_string()))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?;

        Ok(Self { pool })
    }

    fn row_to_stored(id: String, body: &str) -> Result<StoredHost, StoreError> {
        let host: UnifiedHost =
            serde_json::from_str(body).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        Ok(StoredHost { id, host })
    }
}

#[async_trait]
impl AssetStore for SqliteAssetStore {
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        info!("applying unified_assets schema");
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(())
    }

    async fn find_candidates(&self, probe: &UnifiedHost) -> Result<Vec<StoredHost>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, body FROM unified_assets \
             WHERE (?1 IS NOT NULL AND primary_mac_address = ?1) \
                OR (?2 IS NOT NULL AND cloud_instance_id = ?2) \
                OR (?3 IS NOT NULL AND hostname = ?3) \
             ORDER BY rowid",
        )
        .bind(&probe.primary_mac_address)
        .bind(&probe.cloud_instance_id)
        .bind(&probe.hostname)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Io(err.to_string()))?;

        rows.into_iter()
            .map(|row| Self::row_to_stored(row.get::<String, _>("id"), row.get::<&str, _>("body")))
            .collect()
    }

    async fn insert(&self, host: UnifiedHost) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::to_string(&host).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        sqlx::query(
            "INSERT INTO unified_assets \
             (id, primary_mac_address, cloud_instance_id, hostname, private_ip, public_ip, body) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(&host.primary_mac_address)
        .bind(&host.cloud_instance_id)
        .bind(&host.hostname)
        .bind(&host.private_ip)
        .bind(&host.public_ip)
        .bind(&body)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(id)
    }

    async fn replace(&self, id: &str, host: UnifiedHost) -> Result<(), StoreError> {
        let body = serde_json::to_string(&host).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        sqlx::query(
            "UPDATE unified_assets SET \
             primary_mac_address = ?2, cloud_instance_id = ?3, hostname = ?4, \
             private_ip = ?5, public_ip = ?6, body = ?7 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&host.primary_mac_address)
        .bind(&host.cloud_instance_id)
        .bind(&host.hostname)
        .bind(&host.private_ip)
        .bind(&host.public_ip)
        .bind(&body)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StoredHost>, StoreError> {
        let rows = sqlx::query("SELECT id, body FROM unified_assets ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?;
        rows.into_iter()
            .map(|row| Self::row_to_stored(row.get::<String, _>("id"), row.get::<&str, _>("body")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_find_by_hostname_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("assets.db");
        let store = SqliteAssetStore::new(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap();
        store.ensure_indexes().await.unwrap();

        let host = UnifiedHost {
            hostname: Some("box-1".to_owned()),
            ..UnifiedHost::default()
        };
        let id = store.insert(host.clone()).await.unwrap();

        let candidates = store.find_candidates(&host).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, id);
        assert_eq!(candidates[0].host.hostname.as_deref(), Some("box-1"));
    }
}
