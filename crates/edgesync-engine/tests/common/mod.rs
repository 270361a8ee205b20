//! Shared test doubles: in-memory source/store fakes and wiremock helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use edgesync_common::time::{parse_sync_timestamp, truncate_to_seconds};
use edgesync_engine::error::EngineResult;
use edgesync_engine::source::{AssetSource, ExternalAsset};
use edgesync_engine::store::{AssetStore, NewSyncedAsset};

/// Build an external asset with a `YYYY-MM-DD HH:MM:SS` UTC creation time.
pub fn asset(ual: &str, paranet_ual: &str, created_at: &str) -> ExternalAsset {
    let naive = parse_sync_timestamp(created_at).unwrap();
    ExternalAsset {
        ual: ual.to_string(),
        paranet_ual: paranet_ual.to_string(),
        public_assertion_id: Some(format!("assertion-{}", ual)),
        private_assertion_id: None,
        sender: Some("0xsender".to_string()),
        transaction_hash: Some(format!("0xtx-{}", ual)),
        created_at: Utc.from_utc_datetime(&naive),
    }
}

/// Same as [`asset`] but with a fractional-second creation time, the way the
/// runtime node actually stamps rows.
pub fn asset_with_millis(
    ual: &str,
    paranet_ual: &str,
    created_at: &str,
    millis: i64,
) -> ExternalAsset {
    let mut a = asset(ual, paranet_ual, created_at);
    a.created_at += chrono::Duration::milliseconds(millis);
    a
}

#[derive(Default)]
struct SourceState {
    assets: Mutex<Vec<ExternalAsset>>,
    fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory [`AssetSource`] applying the same latest-per-ual / strict
/// watermark semantics as the production query.
#[derive(Clone, Default)]
pub struct InMemorySource {
    state: Arc<SourceState>,
    latency: Duration,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose fetches take `latency`, for concurrency tests.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Arc::default(),
            latency,
        }
    }

    pub fn push(&self, a: ExternalAsset) {
        self.state.assets.lock().unwrap().push(a);
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSource for InMemorySource {
    async fn fetch_latest(
        &self,
        paranet_ual: &str,
        watermark: Option<NaiveDateTime>,
    ) -> EngineResult<Vec<ExternalAsset>> {
        self.state.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(n, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = {
            let assets = self.state.assets.lock().unwrap();
            let mut latest: HashMap<String, ExternalAsset> = HashMap::new();
            for a in assets.iter().filter(|a| a.paranet_ual == paranet_ual) {
                // Strictly-greater watermark comparison, UTC both sides,
                // second-granular like the production query.
                if watermark.map_or(true, |w| truncate_to_seconds(a.created_at.naive_utc()) > w) {
                    latest
                        .entry(a.ual.clone())
                        .and_modify(|cur| {
                            if a.created_at > cur.created_at {
                                *cur = a.clone();
                            }
                        })
                        .or_insert_with(|| a.clone());
                }
            }
            latest.into_values().collect()
        };

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }
}

#[derive(Default)]
struct StoreState {
    rows: Mutex<Vec<NewSyncedAsset>>,
    notifications: Mutex<Vec<(i64, String)>>,
    watermark_reads: AtomicUsize,
}

/// In-memory [`AssetStore`]. Row order is insertion order, standing in for
/// the local id sequence the watermark derivation relies on.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one already-synced row, as if a prior batch had persisted it.
    pub fn seed_row(&self, ual: &str, paranet_ual: &str, runtime_node_synced_at: &str) {
        let stamp = parse_sync_timestamp(runtime_node_synced_at).unwrap();
        self.state.rows.lock().unwrap().push(NewSyncedAsset {
            ual: ual.to_string(),
            paranet_ual: paranet_ual.to_string(),
            public_assertion_id: None,
            private_assertion_id: None,
            sender: None,
            transaction_hash: None,
            backend_synced_at: stamp,
            runtime_node_synced_at: stamp,
            notification_id: 0,
        });
    }

    pub fn rows(&self) -> Vec<NewSyncedAsset> {
        self.state.rows.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(i64, String)> {
        self.state.notifications.lock().unwrap().clone()
    }

    pub fn watermark_reads(&self) -> usize {
        self.state.watermark_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetStore for InMemoryStore {
    async fn latest_watermark(&self, paranet_ual: &str) -> EngineResult<Option<NaiveDateTime>> {
        self.state.watermark_reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.state.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .find(|r| r.paranet_ual == paranet_ual)
            .map(|r| r.runtime_node_synced_at))
    }

    async fn create_notification(&self, asset_count: usize) -> EngineResult<i64> {
        let mut notifications = self.state.notifications.lock().unwrap();
        let id = notifications.len() as i64 + 1;
        notifications.push((
            id,
            edgesync_engine::store::notification_message(asset_count),
        ));
        Ok(id)
    }

    async fn insert_synced_asset(&self, asset: NewSyncedAsset) -> EngineResult<()> {
        self.state.rows.lock().unwrap().push(asset);
        Ok(())
    }
}

/// Mount `GET /params/public` returning the given publish mode and paranet.
pub async fn mount_public_params(server: &MockServer, publish_mode: &str, paranet_ual: Option<&str>) {
    let mut config = vec![json!({"option": "edge_node_publish_mode", "value": publish_mode})];
    if let Some(ual) = paranet_ual {
        config.push(json!({"option": "edge_node_paranet_ual", "value": ual}));
    }

    Mock::given(method("GET"))
        .and(path("/params/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "config": config })))
        .mount(server)
        .await;
}

/// Responder that walks a fixed sequence of JSON bodies, repeating the last
/// one, and counts how many requests it served.
pub struct SequenceResponder {
    responses: Vec<serde_json::Value>,
    hits: Arc<AtomicUsize>,
}

impl SequenceResponder {
    pub fn new(responses: Vec<serde_json::Value>) -> (Self, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        (
            Self {
                responses,
                hits: hits.clone(),
            },
            hits,
        )
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let i = self.hits.fetch_add(1, Ordering::SeqCst);
        let idx = i.min(self.responses.len() - 1);
        ResponseTemplate::new(200).set_body_json(self.responses[idx].clone())
    }
}
