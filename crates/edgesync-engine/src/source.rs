//! Incremental fetcher against the runtime-node database
//!
//! The runtime node appends one row per asset version to
//! `paranet_synced_asset`. The fetcher reads, per UAL, the single latest
//! version in a paranet, optionally restricted to versions created strictly
//! after a watermark. The watermark is interpreted as UTC and bound as a
//! query parameter; interpolating it into the SQL text is exactly the
//! injection surface this module exists to avoid.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::EngineResult;

/// One "latest version" knowledge-asset row from the runtime node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExternalAsset {
    pub ual: String,
    pub paranet_ual: String,
    pub public_assertion_id: Option<String>,
    pub private_assertion_id: Option<String>,
    pub sender: Option<String>,
    pub transaction_hash: Option<String>,
    /// Creation time on the runtime node's clock, normalized to UTC.
    pub created_at: DateTime<Utc>,
}

/// Read capability over the runtime-node data store.
///
/// Implementations must treat an empty result as success: nothing newer than
/// the watermark is the steady state, not an error.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the latest version of every asset in `paranet_ual` created
    /// strictly after `watermark`, or of every asset when no watermark
    /// exists yet (first run). The watermark carries second granularity,
    /// so the comparison truncates `created_at` the same way.
    async fn fetch_latest(
        &self,
        paranet_ual: &str,
        watermark: Option<NaiveDateTime>,
    ) -> EngineResult<Vec<ExternalAsset>>;
}

const FETCH_ALL_LATEST: &str = r#"
    SELECT DISTINCT ON (sa.ual)
           sa.ual, sa.paranet_ual, sa.public_assertion_id,
           sa.private_assertion_id, sa.sender, sa.transaction_hash,
           sa.created_at
    FROM paranet_synced_asset sa
    WHERE sa.paranet_ual = $1
    ORDER BY sa.ual, sa.created_at DESC, sa.id DESC
"#;

// The watermark derives from stored stamps that are truncated to whole
// seconds, so the comparison must be second-granular on both sides: a
// full-precision created_at would stay forever newer than its own derived
// watermark and re-ingest on every tick.
const FETCH_LATEST_AFTER: &str = r#"
    SELECT DISTINCT ON (sa.ual)
           sa.ual, sa.paranet_ual, sa.public_assertion_id,
           sa.private_assertion_id, sa.sender, sa.transaction_hash,
           sa.created_at
    FROM paranet_synced_asset sa
    WHERE sa.paranet_ual = $1
      AND date_trunc('second', sa.created_at) > $2
    ORDER BY sa.ual, sa.created_at DESC, sa.id DESC
"#;

/// Production [`AssetSource`] over the runtime node's database.
pub struct RuntimeNodeSource {
    pool: PgPool,
}

impl RuntimeNodeSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetSource for RuntimeNodeSource {
    async fn fetch_latest(
        &self,
        paranet_ual: &str,
        watermark: Option<NaiveDateTime>,
    ) -> EngineResult<Vec<ExternalAsset>> {
        let assets = match watermark {
            None => {
                sqlx::query_as::<_, ExternalAsset>(FETCH_ALL_LATEST)
                    .bind(paranet_ual)
                    .fetch_all(&self.pool)
                    .await?
            },
            Some(watermark) => {
                // The watermark is stored without a timezone but means UTC;
                // make that explicit at the bind site.
                let watermark_utc: DateTime<Utc> = Utc.from_utc_datetime(&watermark);
                sqlx::query_as::<_, ExternalAsset>(FETCH_LATEST_AFTER)
                    .bind(paranet_ual)
                    .bind(watermark_utc)
                    .fetch_all(&self.pool)
                    .await?
            },
        };

        Ok(assets)
    }
}
