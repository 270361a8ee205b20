//! Remote parameter service client
//!
//! The auth service exposes `GET /params/public` returning the node's public
//! configuration as a flat option list. The engine consumes three kinds of
//! keys from it:
//!
//! - `edge_node_publish_mode` — the sync gate; `public` means this node is
//!   publicly writable and must not run the sync job.
//! - `edge_node_paranet_ual` — the paranet scope key for sync.
//! - `*_pipeline_id` — per-user knowledge-mining pipeline identifiers.
//!
//! Options are re-read on every scheduler tick; nothing is cached here.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Default timeout for parameter service requests in seconds.
pub const DEFAULT_PARAMS_TIMEOUT_SECS: u64 = 30;

/// Option key for the publish-mode gate.
pub const PUBLISH_MODE_OPTION: &str = "edge_node_publish_mode";

/// Option key for the paranet scope.
pub const PARANET_UAL_OPTION: &str = "edge_node_paranet_ual";

/// One `{option, value}` pair from the parameter service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption {
    pub option: String,
    pub value: Option<String>,
}

/// Wire shape of `GET /params/public`.
#[derive(Debug, Deserialize)]
struct PublicParamsResponse {
    config: Vec<ConfigOption>,
}

/// Publish mode of the edge node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    /// Publicly writable; the node is not responsible for syncing.
    Public,
    /// Privately writable; sync runs.
    Private,
    /// Value present but not recognized. Treated as private for the gate.
    Unknown(String),
}

impl PublishMode {
    fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("public") => PublishMode::Public,
            Some("private") | None => PublishMode::Private,
            Some(other) => PublishMode::Unknown(other.to_string()),
        }
    }

    /// Whether the sync gate is closed.
    pub fn is_public(&self) -> bool {
        matches!(self, PublishMode::Public)
    }
}

/// A snapshot of the node's public parameters.
#[derive(Debug, Clone)]
pub struct PublicParams {
    options: Vec<ConfigOption>,
}

impl PublicParams {
    pub fn from_options(options: Vec<ConfigOption>) -> Self {
        Self { options }
    }

    /// Look up an option value. Empty values count as absent, matching the
    /// service's convention of blank-but-present rows.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.option == name)
            .and_then(|o| o.value.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn publish_mode(&self) -> PublishMode {
        PublishMode::from_value(self.get(PUBLISH_MODE_OPTION))
    }

    pub fn paranet_ual(&self) -> Option<&str> {
        self.get(PARANET_UAL_OPTION)
    }

    /// Look up a per-user `*_pipeline_id` option.
    pub fn pipeline_id(&self, option_name: &str) -> Option<&str> {
        self.get(option_name)
    }
}

/// HTTP client for the remote parameter service
pub struct ParamsClient {
    client: Client,
    base_url: String,
}

impl ParamsClient {
    /// Create a new parameter service client
    pub fn new(base_url: impl Into<String>) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_PARAMS_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the node's public parameters
    pub async fn fetch_public(&self) -> EngineResult<PublicParams> {
        let url = format!("{}/params/public", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(EngineError::Http)?;

        let body: PublicParamsResponse = response.json().await?;

        Ok(PublicParams::from_options(body.config))
    }
}
