//! Remote document parsing.
//!
//! A job is uploaded, polled until it reaches a terminal status, and on
//! success its rendered markdown is fetched. Polling is bounded by an attempt
//! count and an optional deadline, with the interval growing geometrically.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::{ExtractError, TextExtractor};
use crate::sources::SourceError;
use crate::utils::{ensure_success, HttpClient};

/// Status reported by the parsing service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Success,
    Error,
    /// Anything else the service reports; not terminal
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => JobStatus::Pending,
            "SUCCESS" => JobStatus::Success,
            "ERROR" => JobStatus::Error,
            _ => JobStatus::Other(raw.trim().to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }
}

#[derive(Debug, Error)]
pub enum ParseJobError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Parsing service request failed: {0}")]
    Transport(#[from] SourceError),

    #[error("Parsing job {job_id} failed")]
    Failed { job_id: String },

    #[error("Parsing job {job_id} still not finished after {polls} polls")]
    Exhausted { job_id: String, polls: u32 },

    #[error("Parsing job {job_id} exceeded its deadline of {limit_secs}s")]
    DeadlineExceeded { job_id: String, limit_secs: u64 },

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The three operations of a parsing service
#[async_trait]
pub trait ParseService: Send + Sync {
    /// Submit a document; returns the job id
    async fn upload(&self, path: &Path) -> Result<String, ParseJobError>;

    async fn status(&self, job_id: &str) -> Result<JobStatus, ParseJobError>;

    /// Rendered result; only meaningful once the job succeeded
    async fn markdown(&self, job_id: &str) -> Result<String, ParseJobError>;
}

/// Polling policy for one job
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff_multiplier: f64,
    /// Upper bound on status requests
    pub max_attempts: u32,
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            backoff_multiplier: 1.5,
            max_attempts: 600,
            deadline: Some(Duration::from_secs(1800)),
        }
    }
}

impl PollConfig {
    /// Sleep after the `attempt`-th poll (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.interval.as_secs_f64();
        let cap = self.max_interval.max(self.interval).as_secs_f64();
        let factor = self
            .backoff_multiplier
            .max(1.0)
            .powi(attempt.min(i32::MAX as u32) as i32);
        Duration::from_secs_f64((base * factor).min(cap))
    }
}

/// Drive one job from upload to a terminal status.
pub async fn run_job(
    service: &dyn ParseService,
    path: &Path,
    poll: &PollConfig,
) -> Result<String, ParseJobError> {
    let job_id = service.upload(path).await?;
    tracing::debug!("Uploaded {} as parsing job {}", path.display(), job_id);

    let started = Instant::now();
    let max_attempts = poll.max_attempts.max(1);
    let mut polls = 0u32;

    loop {
        if polls >= max_attempts {
            return Err(ParseJobError::Exhausted { job_id, polls });
        }
        polls += 1;

        let status = service.status(&job_id).await?;
        tracing::debug!("Job {} poll {}: {:?}", job_id, polls, status);

        match status {
            JobStatus::Success => {
                let markdown = service.markdown(&job_id).await?;
                tracing::info!("Job {} finished after {} polls", job_id, polls);
                return Ok(markdown);
            }
            JobStatus::Error => {
                tracing::warn!("Job {} reported ERROR", job_id);
                return Err(ParseJobError::Failed { job_id });
            }
            JobStatus::Pending | JobStatus::Other(_) => {}
        }

        let delay = poll.delay_for(polls - 1);
        if let Some(limit) = poll.deadline {
            if started.elapsed() + delay > limit {
                return Err(ParseJobError::DeadlineExceeded {
                    job_id,
                    limit_secs: limit.as_secs(),
                });
            }
        }
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct MarkdownResponse {
    #[serde(default)]
    markdown: Option<String>,
}

/// Options sent with every upload
const UPLOAD_OPTIONS: [(&str, &str); 5] = [
    ("structured_output", "false"),
    ("disable_ocr", "false"),
    ("disable_image_extraction", "false"),
    ("adaptive_long_table", "true"),
    ("outlined_table_extraction", "true"),
];

/// HTTP client for a LlamaParse-compatible service
#[derive(Debug, Clone)]
pub struct LlamaParseClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl LlamaParseClient {
    pub fn new(client: HttpClient, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn job_url(&self, job_id: &str) -> String {
        format!(
            "{}/api/parsing/job/{}",
            self.base_url,
            urlencoding::encode(job_id)
        )
    }
}

#[async_trait]
impl ParseService for LlamaParseClient {
    async fn upload(&self, path: &Path) -> Result<String, ParseJobError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ParseJobError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| ParseJobError::Upload(e.to_string()))?;
        let form = UPLOAD_OPTIONS
            .iter()
            .fold(reqwest::multipart::Form::new().part("file", part), |form, (k, v)| {
                form.text(*k, *v)
            });

        let upload = async {
            let response = self
                .client
                .post(&format!("{}/api/parsing/upload", self.base_url))
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await?;
            let body: UploadResponse = ensure_success(response).await?.json().await?;
            Ok::<_, SourceError>(body.id)
        };

        upload
            .await
            .map_err(|e| ParseJobError::Upload(e.to_string()))
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, ParseJobError> {
        let response = self
            .client
            .get(&self.job_url(job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(SourceError::from)?;
        let body: StatusResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(SourceError::from)?;
        Ok(JobStatus::parse(&body.status))
    }

    async fn markdown(&self, job_id: &str) -> Result<String, ParseJobError> {
        let response = self
            .client
            .get(&format!("{}/result/markdown", self.job_url(job_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(SourceError::from)?;
        let body: MarkdownResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(SourceError::from)?;
        Ok(body.markdown.unwrap_or_default())
    }
}

/// Extraction strategy that delegates to a parsing service
#[derive(Clone)]
pub struct RemoteExtractor {
    service: Arc<dyn ParseService>,
    poll: PollConfig,
}

impl RemoteExtractor {
    pub fn new(service: Arc<dyn ParseService>, poll: PollConfig) -> Self {
        Self { service, poll }
    }
}

impl std::fmt::Debug for RemoteExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExtractor")
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextExtractor for RemoteExtractor {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        Ok(run_job(self.service.as_ref(), path, &self.poll).await?)
    }
}
