//! One sync attempt: gate check, watermark read, fetch, materialize
//!
//! An attempt is strictly sequential. Ordering inside it is what keeps the
//! derived watermark correct: fetch happens before materialize, and records
//! are materialized in ascending external-timestamp order so the newest
//! local row always carries the greatest `runtime_node_synced_at`.
//!
//! Persistence is per-row with no wrapping transaction. If an insert fails
//! partway through a batch, the rows already written count as synced and the
//! rest are not retried; the semantic is at-most-once per tick, best effort.

use chrono::Utc;
use tracing::{debug, info};

use edgesync_common::time::truncate_to_seconds;

use crate::error::{EngineError, EngineResult};
use crate::params::{ParamsClient, PARANET_UAL_OPTION};
use crate::source::{AssetSource, ExternalAsset};
use crate::store::{AssetStore, NewSyncedAsset};

/// Result of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Publish mode is `public`; the tick is a defined no-op.
    SkippedPublicMode,
    /// Nothing newer than the watermark. Success, not an error.
    UpToDate,
    /// A batch was materialized.
    Synced { count: usize },
}

/// The sync engine: remote gate + fetcher + materializer.
pub struct SyncEngine<S, L> {
    params: ParamsClient,
    source: S,
    store: L,
}

impl<S, L> SyncEngine<S, L>
where
    S: AssetSource,
    L: AssetStore,
{
    pub fn new(params: ParamsClient, source: S, store: L) -> Self {
        Self {
            params,
            source,
            store,
        }
    }

    /// Run one sync attempt.
    ///
    /// The publish-mode gate and the paranet scope come from the remote
    /// parameter service on every attempt, and the watermark is read fresh
    /// from the store, so a partially failed prior tick cannot leave this
    /// one acting on stale state.
    pub async fn run_attempt(&self) -> EngineResult<SyncOutcome> {
        debug!("Checking edge node publish mode");
        let params = self.params.fetch_public().await?;

        if params.publish_mode().is_public() {
            info!("Edge node publish mode is public, skipping sync");
            return Ok(SyncOutcome::SkippedPublicMode);
        }

        let paranet_ual = params
            .paranet_ual()
            .ok_or_else(|| EngineError::MissingOption(PARANET_UAL_OPTION.to_string()))?
            .to_string();

        let watermark = self.store.latest_watermark(&paranet_ual).await?;
        match watermark {
            None => debug!(paranet_ual = %paranet_ual, "No watermark, first-time fetch"),
            Some(w) => debug!(paranet_ual = %paranet_ual, watermark = %w, "Incremental fetch"),
        }

        let assets = self.source.fetch_latest(&paranet_ual, watermark).await?;

        self.materialize(assets).await
    }

    /// Persist a fetched batch: one notification, then each asset stamped
    /// and inserted in ascending external-timestamp order.
    async fn materialize(&self, mut assets: Vec<ExternalAsset>) -> EngineResult<SyncOutcome> {
        if assets.is_empty() {
            debug!("No new knowledge assets");
            return Ok(SyncOutcome::UpToDate);
        }

        // Ascending creation order keeps the derived watermark monotonic
        // even when a batch fails partway through.
        assets.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.ual.cmp(&b.ual))
        });

        let count = assets.len();
        let notification_id = self.store.create_notification(count).await?;
        let backend_synced_at = truncate_to_seconds(Utc::now().naive_utc());

        for asset in assets {
            let row = NewSyncedAsset {
                ual: asset.ual,
                paranet_ual: asset.paranet_ual,
                public_assertion_id: asset.public_assertion_id,
                private_assertion_id: asset.private_assertion_id,
                sender: asset.sender,
                transaction_hash: asset.transaction_hash,
                backend_synced_at,
                runtime_node_synced_at: truncate_to_seconds(asset.created_at.naive_utc()),
                notification_id,
            };
            self.store.insert_synced_asset(row).await?;
        }

        info!(count, notification_id, "Sync batch materialized");
        Ok(SyncOutcome::Synced { count })
    }
}
