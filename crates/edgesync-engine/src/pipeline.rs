//! Knowledge-mining pipeline client: submission and status polling
//!
//! Submission is a multipart POST carrying the file, the resolved pipeline
//! identifier, and the file format. The remote answering `success: false` is
//! a rejection value, not an error; only transport failures surface as
//! `Err`, so callers can tell "the operation was rejected" from "the
//! operation could not be attempted".
//!
//! Polling is a bounded, cancellable loop: sleep one interval, query the
//! run, classify the status. `success` and `failed`/`not_found` are
//! terminal. Known in-flight statuses keep the loop going; an unrecognized
//! status burns a small malformed-response budget and then fails, instead of
//! masking a broken remote as infinite patience.

use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{
    DEFAULT_PIPELINE_MALFORMED_BUDGET, DEFAULT_PIPELINE_POLL_INTERVAL_MS,
    DEFAULT_PIPELINE_POLL_MAX_ATTEMPTS,
};
use crate::error::{PipelineError, PipelineResult};
use crate::params::PublicParams;

// ============================================================================
// Pipeline Routing Constants
// ============================================================================

/// Fixed pipeline for JSON-LD input. Selected by content type alone,
/// bypassing the per-user pipeline configuration.
pub const JSONLD_PIPELINE_ID: &str = "simple_json_to_jsonld";

/// Per-user pipeline-id option for JSON input.
pub const JSON_PIPELINE_OPTION: &str = "kmining_json_pipeline_id";

/// Per-user pipeline-id option for PDF input.
pub const PDF_PIPELINE_OPTION: &str = "kmining_pdf_pipeline_id";

/// Per-user pipeline-id option for CSV input.
pub const CSV_PIPELINE_OPTION: &str = "kmining_csv_pipeline_id";

/// Wire statuses that mean "still running". Anything terminal or in this set
/// is recognized; everything else counts against the malformed budget.
const IN_FLIGHT_STATUSES: &[&str] = &[
    "pending",
    "queued",
    "started",
    "running",
    "in-progress",
    "in_progress",
];

/// File format sent alongside a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Pdf,
    Csv,
}

impl FileFormat {
    /// Classify a content type. JSON-LD maps to `Json` for the format field;
    /// its pipeline routing is handled separately.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "application/json" | "application/ld+json" => Some(FileFormat::Json),
            "application/pdf" => Some(FileFormat::Pdf),
            "text/csv" => Some(FileFormat::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Pdf => "pdf",
            FileFormat::Csv => "csv",
        }
    }
}

/// Resolve the pipeline identifier for a content type.
///
/// `application/ld+json` always selects [`JSONLD_PIPELINE_ID`], independent
/// of user configuration. The other supported content types resolve their
/// respective per-user option; `None` means the content type is unsupported
/// or the user has no pipeline configured for it.
pub fn resolve_pipeline_id(content_type: &str, params: &PublicParams) -> Option<String> {
    match content_type {
        "application/ld+json" => Some(JSONLD_PIPELINE_ID.to_string()),
        "application/json" => params.pipeline_id(JSON_PIPELINE_OPTION).map(str::to_string),
        "application/pdf" => params.pipeline_id(PDF_PIPELINE_OPTION).map(str::to_string),
        "text/csv" => params.pipeline_id(CSV_PIPELINE_OPTION).map(str::to_string),
        _ => None,
    }
}

/// Engine-visible operation status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    #[serde(rename = "NOT-STARTED")]
    NotStarted,
    #[serde(rename = "IN-PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "NOT-READY")]
    NotReady,
}

impl PipelineStatus {
    /// Whether this status ends the polling loop.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineStatus::Completed | PipelineStatus::Failed | PipelineStatus::NotReady
        )
    }
}

/// Map a lowercased wire status onto the engine vocabulary. `not_found`
/// means the service no longer knows the run, which the caller treats the
/// same as a failure. `None` is an unrecognized status.
fn classify_wire_status(status: Option<&str>) -> Option<PipelineStatus> {
    match status {
        Some("success") => Some(PipelineStatus::Completed),
        Some("failed") => Some(PipelineStatus::Failed),
        Some("not_found") => Some(PipelineStatus::NotReady),
        Some(s) if IN_FLIGHT_STATUSES.contains(&s) => Some(PipelineStatus::InProgress),
        _ => None,
    }
}

/// A file handed to [`PipelineClient::submit`].
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Tracking identifiers for an accepted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub pipeline_id: String,
    pub run_id: String,
}

/// Result of a submission: accepted with tracking identifiers, or the
/// remote's `success: false` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Accepted(PipelineRun),
    Rejected,
}

/// Terminal outcome of a polled run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The run completed; carries the result payload.
    Completed(Value),
    /// The run failed or was not found. A value, not an error.
    Rejected,
}

/// Polling bounds. The reference behavior polled forever; both bounds here
/// are deliberate hardening.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub malformed_budget: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_PIPELINE_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_PIPELINE_POLL_MAX_ATTEMPTS,
            malformed_budget: DEFAULT_PIPELINE_MALFORMED_BUDGET,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    success: bool,
    #[serde(rename = "pipelineId")]
    pipeline_id: Option<String>,
    #[serde(rename = "runId")]
    run_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Option<String>,
    result: Option<Value>,
}

/// HTTP client for the knowledge-mining service
pub struct PipelineClient {
    client: Client,
    base_url: String,
    policy: PollPolicy,
}

impl PipelineClient {
    /// Create a new pipeline client
    pub fn new(base_url: impl Into<String>, policy: PollPolicy) -> PipelineResult<Self> {
        // No whole-request timeout: uploads can be large. Transport errors
        // still surface per call.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            policy,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Submit a file to the pipeline service.
    ///
    /// Returns [`Submission::Rejected`] when the remote reports
    /// `success: false`; transport failures are `Err`.
    pub async fn submit(
        &self,
        file: PipelineFile,
        pipeline_id: &str,
        session_cookie: &str,
    ) -> PipelineResult<Submission> {
        let format = FileFormat::from_content_type(&file.content_type)
            .ok_or_else(|| PipelineError::UnsupportedContentType(file.content_type.clone()))?;

        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("pipelineId", pipeline_id.to_string())
            .text("fileFormat", format.as_str().to_string());

        let response = self
            .client
            .post(self.url("trigger-pipeline"))
            .header(COOKIE, session_cookie)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body: TriggerResponse = response.json().await?;

        if !body.success {
            warn!(pipeline_id, "Pipeline trigger rejected");
            return Ok(Submission::Rejected);
        }

        match (body.pipeline_id, body.run_id) {
            (Some(pipeline_id), Some(run_id)) => {
                info!(
                    pipeline_id = %pipeline_id,
                    run_id = %run_id,
                    status = ?PipelineStatus::NotStarted,
                    "Pipeline triggered"
                );
                Ok(Submission::Accepted(PipelineRun {
                    pipeline_id,
                    run_id,
                }))
            },
            _ => Err(PipelineError::MalformedResponse(
                "trigger accepted without pipelineId/runId".to_string(),
            )),
        }
    }

    /// Poll a run until it reaches a terminal state.
    ///
    /// Each iteration waits one interval, then queries. `success` returns
    /// the result payload; `failed` and `not_found` return the rejection
    /// sentinel. The loop stops early on cancellation, on an exhausted
    /// malformed-status budget, or after `max_attempts` queries.
    pub async fn poll(
        &self,
        run: &PipelineRun,
        session_cookie: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<PipelineOutcome> {
        let url = self.url("check-pipeline-status");
        let mut malformed_seen = 0u32;

        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {},
            }

            debug!(attempt, run_id = %run.run_id, "Checking pipeline status");
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("pipelineId", run.pipeline_id.as_str()),
                    ("runId", run.run_id.as_str()),
                ])
                .header(COOKIE, session_cookie)
                .send()
                .await?
                .error_for_status()?;

            let body: StatusResponse = response.json().await?;
            let status = body.status.as_deref().map(str::to_ascii_lowercase);

            match classify_wire_status(status.as_deref()) {
                Some(PipelineStatus::Completed) => {
                    info!(run_id = %run.run_id, attempt, "Pipeline run completed");
                    return Ok(PipelineOutcome::Completed(body.result.unwrap_or(Value::Null)));
                },
                Some(s) if s.is_terminal() => {
                    warn!(run_id = %run.run_id, status = ?s, "Pipeline run rejected");
                    return Ok(PipelineOutcome::Rejected);
                },
                Some(s) => {
                    debug!(run_id = %run.run_id, status = ?s, "Pipeline still running");
                },
                None => {
                    malformed_seen += 1;
                    warn!(
                        run_id = %run.run_id,
                        status = ?status,
                        malformed_seen,
                        "Unrecognized pipeline status"
                    );
                    if malformed_seen > self.policy.malformed_budget {
                        return Err(PipelineError::MalformedStatus {
                            raw: status.unwrap_or_else(|| "<missing>".to_string()),
                        });
                    }
                },
            }
        }

        Err(PipelineError::AttemptsExhausted {
            attempts: self.policy.max_attempts,
        })
    }

    /// Submit and poll to a terminal outcome. A rejected submission
    /// short-circuits without polling.
    pub async fn run_to_completion(
        &self,
        file: PipelineFile,
        pipeline_id: &str,
        session_cookie: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<PipelineOutcome> {
        match self.submit(file, pipeline_id, session_cookie).await? {
            Submission::Rejected => Ok(PipelineOutcome::Rejected),
            Submission::Accepted(run) => self.poll(&run, session_cookie, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ConfigOption, PublicParams};

    fn user_params() -> PublicParams {
        PublicParams::from_options(vec![
            ConfigOption {
                option: JSON_PIPELINE_OPTION.to_string(),
                value: Some("json-pipe".to_string()),
            },
            ConfigOption {
                option: PDF_PIPELINE_OPTION.to_string(),
                value: Some("pdf-pipe".to_string()),
            },
            ConfigOption {
                option: CSV_PIPELINE_OPTION.to_string(),
                value: Some("csv-pipe".to_string()),
            },
        ])
    }

    #[test]
    fn test_format_classification() {
        assert_eq!(
            FileFormat::from_content_type("application/json"),
            Some(FileFormat::Json)
        );
        assert_eq!(
            FileFormat::from_content_type("application/ld+json"),
            Some(FileFormat::Json)
        );
        assert_eq!(
            FileFormat::from_content_type("application/pdf"),
            Some(FileFormat::Pdf)
        );
        assert_eq!(FileFormat::from_content_type("text/csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_content_type("image/png"), None);
    }

    #[test]
    fn test_jsonld_routes_to_fixed_pipeline() {
        // Independent of user configuration, including when the user has a
        // JSON pipeline configured.
        assert_eq!(
            resolve_pipeline_id("application/ld+json", &user_params()),
            Some(JSONLD_PIPELINE_ID.to_string())
        );
        assert_eq!(
            resolve_pipeline_id("application/ld+json", &PublicParams::from_options(vec![])),
            Some(JSONLD_PIPELINE_ID.to_string())
        );
    }

    #[test]
    fn test_configured_routes() {
        let params = user_params();
        assert_eq!(
            resolve_pipeline_id("application/json", &params),
            Some("json-pipe".to_string())
        );
        assert_eq!(
            resolve_pipeline_id("application/pdf", &params),
            Some("pdf-pipe".to_string())
        );
        assert_eq!(
            resolve_pipeline_id("text/csv", &params),
            Some("csv-pipe".to_string())
        );
    }

    #[test]
    fn test_unconfigured_and_unsupported_routes() {
        let empty = PublicParams::from_options(vec![]);
        assert_eq!(resolve_pipeline_id("application/json", &empty), None);
        assert_eq!(resolve_pipeline_id("image/png", &user_params()), None);
    }

    #[test]
    fn test_status_vocabulary_wire_names() {
        assert_eq!(
            serde_json::to_string(&PipelineStatus::InProgress).unwrap(),
            "\"IN-PROGRESS\""
        );
        assert_eq!(
            serde_json::from_str::<PipelineStatus>("\"NOT-READY\"").unwrap(),
            PipelineStatus::NotReady
        );
    }

    #[test]
    fn test_wire_status_classification() {
        assert_eq!(
            classify_wire_status(Some("success")),
            Some(PipelineStatus::Completed)
        );
        assert_eq!(
            classify_wire_status(Some("failed")),
            Some(PipelineStatus::Failed)
        );
        assert_eq!(
            classify_wire_status(Some("not_found")),
            Some(PipelineStatus::NotReady)
        );
        for in_flight in IN_FLIGHT_STATUSES.iter().copied() {
            assert_eq!(
                classify_wire_status(Some(in_flight)),
                Some(PipelineStatus::InProgress)
            );
        }
        assert_eq!(classify_wire_status(Some("transcending")), None);
        assert_eq!(classify_wire_status(None), None);

        assert!(PipelineStatus::NotReady.is_terminal());
        assert!(!PipelineStatus::InProgress.is_terminal());
        assert!(!PipelineStatus::NotStarted.is_terminal());
    }

    #[test]
    fn test_trigger_response_shapes() {
        let accepted: TriggerResponse =
            serde_json::from_str(r#"{"success":true,"pipelineId":"p","runId":"r"}"#).unwrap();
        assert!(accepted.success);
        assert_eq!(accepted.pipeline_id.as_deref(), Some("p"));

        let rejected: TriggerResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(!rejected.success);
        assert!(rejected.run_id.is_none());
    }
}
