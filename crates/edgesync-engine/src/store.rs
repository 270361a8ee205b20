//! Local persistence: synced assets, notifications, and the derived watermark
//!
//! The watermark is not a stored entity. It is the `runtime_node_synced_at`
//! of the newest synced asset for a paranet, read by descending local id.
//! Watermark advance is therefore an emergent property of successful
//! materialization; there is no separate write path, and the value must be
//! re-read on every tick rather than cached.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::EngineResult;

/// Fixed title for batch notifications.
pub const NOTIFICATION_TITLE: &str = "New Knowledge assets are created!";

/// Notification message for a batch of `count` new assets.
pub fn notification_message(count: usize) -> String {
    format!(
        "Your node has ingested {} new knowledge assets since your last login.",
        count
    )
}

/// A locally persisted mirror of one external "latest version" asset.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncedAsset {
    pub id: i64,
    pub ual: String,
    pub paranet_ual: String,
    pub public_assertion_id: Option<String>,
    pub private_assertion_id: Option<String>,
    pub sender: Option<String>,
    pub transaction_hash: Option<String>,
    /// Local wall-clock time of the copy (UTC, whole seconds).
    pub backend_synced_at: NaiveDateTime,
    /// The external record's own creation time (UTC, whole seconds).
    pub runtime_node_synced_at: NaiveDateTime,
    /// Owning batch notification.
    pub notification_id: i64,
}

/// Insert shape for a synced asset. Carries no local id; the external row's
/// own id and bookkeeping stamps never leak into the local identifier space.
#[derive(Debug, Clone)]
pub struct NewSyncedAsset {
    pub ual: String,
    pub paranet_ual: String,
    pub public_assertion_id: Option<String>,
    pub private_assertion_id: Option<String>,
    pub sender: Option<String>,
    pub transaction_hash: Option<String>,
    pub backend_synced_at: NaiveDateTime,
    pub runtime_node_synced_at: NaiveDateTime,
    pub notification_id: i64,
}

/// Summary record for one non-empty sync batch.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Write capability over the local backend store, plus the watermark read.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// The `runtime_node_synced_at` of the newest synced asset for the
    /// paranet, or `None` when nothing has been synced yet (full fetch).
    async fn latest_watermark(&self, paranet_ual: &str) -> EngineResult<Option<NaiveDateTime>>;

    /// Create the batch notification and return its id.
    async fn create_notification(&self, asset_count: usize) -> EngineResult<i64>;

    /// Persist one synced asset.
    async fn insert_synced_asset(&self, asset: NewSyncedAsset) -> EngineResult<()>;
}

/// Production [`AssetStore`] over the backend database.
pub struct PgAssetStore {
    pool: PgPool,
}

impl PgAssetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetStore for PgAssetStore {
    async fn latest_watermark(&self, paranet_ual: &str) -> EngineResult<Option<NaiveDateTime>> {
        let watermark = sqlx::query_scalar::<_, NaiveDateTime>(
            r#"
            SELECT runtime_node_synced_at
            FROM synced_assets
            WHERE paranet_ual = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(paranet_ual)
        .fetch_optional(&self.pool)
        .await?;

        Ok(watermark)
    }

    async fn create_notification(&self, asset_count: usize) -> EngineResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO notifications (title, message, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id
            "#,
        )
        .bind(NOTIFICATION_TITLE)
        .bind(notification_message(asset_count))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_synced_asset(&self, asset: NewSyncedAsset) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO synced_assets
                (ual, paranet_ual, public_assertion_id, private_assertion_id,
                 sender, transaction_hash, backend_synced_at,
                 runtime_node_synced_at, notification_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&asset.ual)
        .bind(&asset.paranet_ual)
        .bind(&asset.public_assertion_id)
        .bind(&asset.private_assertion_id)
        .bind(&asset.sender)
        .bind(&asset.transaction_hash)
        .bind(asset.backend_synced_at)
        .bind(asset.runtime_node_synced_at)
        .bind(asset.notification_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_message_states_count() {
        assert_eq!(
            notification_message(1),
            "Your node has ingested 1 new knowledge assets since your last login."
        );
        assert!(notification_message(42).contains("42"));
    }

    #[test]
    fn test_notification_title_is_fixed() {
        assert_eq!(NOTIFICATION_TITLE, "New Knowledge assets are created!");
    }
}
