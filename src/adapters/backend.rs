//! HTTP client for the LTUAS inference backend.
//!
//! Endpoints:
//! - `POST /run` (multipart: `file`, optional `prompt`)
//! - `GET /status/{runId}`
//! - `POST /cancel/{runId}`

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ApiError, RunBackend, StatusSource};
use crate::config::ResolvedConfig;
use crate::domain::{RunId, StartRunResponse, StatusResponse};
use crate::ingest::AudioUpload;

/// Error body the backend sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Fallback messages for a failed request
struct Fallback {
    /// Body could not be parsed at all
    unparseable: &'static str,
    /// Body parsed but carried no `error` field
    missing: &'static str,
}

const START_FALLBACK: Fallback = Fallback {
    unparseable: "Unknown error",
    missing: "Failed to start pipeline",
};

const STATUS_FALLBACK: Fallback = Fallback {
    unparseable: "Not found",
    missing: "Failed to fetch status",
};

/// Backend HTTP client
pub struct BackendClient {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl BackendClient {
    /// Create a new client for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.backend_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build endpoint URL
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-2xx response into an [`ApiError::Http`]
    async fn http_error(response: reqwest::Response, fallback: &Fallback) -> ApiError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text, fallback);
        warn!(status = status.as_u16(), %message, "Backend returned an error");
        ApiError::Http {
            status: status.as_u16(),
            message,
        }
    }

    /// Read a 2xx body as JSON, failing closed on unexpected shapes
    async fn parse_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// Submit an audio file as a new run
    #[instrument(skip(self, upload), fields(file = %upload.path.display()))]
    pub async fn start_run(&self, upload: &AudioUpload) -> Result<StartRunResponse, ApiError> {
        upload.validate()?;

        let file_bytes = tokio::fs::read(&upload.path).await?;
        let file_part = Part::bytes(file_bytes)
            .file_name(upload.file_name())
            .mime_str(upload.mime_type()?)?;

        let mut form = Form::new().part("file", file_part);
        if let Some(prompt) = upload.prompt() {
            form = form.text("prompt", prompt.to_string());
        }

        let response = self
            .client
            .post(self.url("run"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::http_error(response, &START_FALLBACK).await);
        }

        let started: StartRunResponse = Self::parse_body(response).await?;
        debug!(run_id = %started.run_id, status = %started.status, "Run started");
        Ok(started)
    }

    /// Fetch the status of a run
    #[instrument(skip(self), fields(run_id = %run_id))]
    pub async fn fetch_status(&self, run_id: &RunId) -> Result<StatusResponse, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("status/{}", run_id)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::http_error(response, &STATUS_FALLBACK).await);
        }

        Self::parse_body(response).await
    }

    /// Cancel a run. Any non-2xx answer is a hard failure.
    #[instrument(skip(self), fields(run_id = %run_id))]
    pub async fn cancel_run(&self, run_id: &RunId) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("cancel/{}", run_id)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: "Failed to cancel run".to_string(),
            });
        }

        Ok(())
    }
}

/// Pick the server-supplied message or the matching fallback
fn error_message(body: &str, fallback: &Fallback) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(message) }) if !message.is_empty() => message,
        Ok(_) => fallback.missing.to_string(),
        Err(_) => fallback.unparseable.to_string(),
    }
}

#[async_trait]
impl StatusSource for BackendClient {
    async fn fetch_status(&self, run_id: &RunId) -> Result<StatusResponse, ApiError> {
        BackendClient::fetch_status(self, run_id).await
    }
}

#[async_trait]
impl RunBackend for BackendClient {
    async fn start_run(&self, upload: &AudioUpload) -> Result<StartRunResponse, ApiError> {
        BackendClient::start_run(self, upload).await
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<(), ApiError> {
        BackendClient::cancel_run(self, run_id).await
    }
}
