//! Adapter interfaces for the inference backend.
//!
//! The poller only needs [`StatusSource`]; the CLI and the upload flow use
//! the wider [`RunBackend`]. [`BackendClient`] implements both over HTTP.

pub mod backend;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{RunId, StartRunResponse, StatusResponse};
use crate::ingest::{AudioUpload, UploadError};

pub use backend::BackendClient;

/// Errors that can occur talking to the backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed before a response was received
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-2xx response; `message` is server-supplied or a fixed fallback
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid upload: {0}")]
    Upload(#[from] UploadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status, if the backend answered at all
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Http { status, .. } => reqwest::StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Anything that can report the status of a run
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of a run (`GET /status/{runId}`)
    async fn fetch_status(&self, run_id: &RunId) -> Result<StatusResponse, ApiError>;
}

/// Full backend surface: start, observe and cancel runs
#[async_trait]
pub trait RunBackend: StatusSource {
    /// Submit an audio file as a new run (`POST /run`)
    async fn start_run(&self, upload: &AudioUpload) -> Result<StartRunResponse, ApiError>;

    /// Ask the backend to cancel a run (`POST /cancel/{runId}`)
    async fn cancel_run(&self, run_id: &RunId) -> Result<(), ApiError>;
}
