//! Results loading and export.
//!
//! After navigation the results view fetches the run status once and shows
//! either the result payload or an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::adapters::StatusSource;
use crate::domain::{PipelineResult, RunId};

/// Shown when a run finished without result or error
pub const NO_RESULTS: &str = "No results available";

/// What the results view displays
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsOutcome {
    /// Raw payload plus its typed view, when it fits the known shape
    Ready {
        raw: serde_json::Value,
        parsed: Option<PipelineResult>,
    },
    Failed(String),
}

/// Fetch the results of a finished run
#[instrument(skip(source), fields(run_id = %run_id))]
pub async fn load_results(source: &dyn StatusSource, run_id: &RunId) -> ResultsOutcome {
    match source.fetch_status(run_id).await {
        Ok(response) => match (response.result, response.error) {
            (Some(raw), _) => {
                let parsed = PipelineResult::from_value(&raw);
                if parsed.is_none() {
                    warn!("Result payload has an unrecognised shape, showing raw JSON");
                }
                ResultsOutcome::Ready { raw, parsed }
            }
            (None, Some(error)) => ResultsOutcome::Failed(error),
            (None, None) => ResultsOutcome::Failed(NO_RESULTS.to_string()),
        },
        Err(err) => {
            warn!(error = %err, "Failed to load results");
            ResultsOutcome::Failed(err.to_string())
        }
    }
}

/// Default export file name: `ltuas-result-<first 8 chars of run id>.json`
pub fn export_file_name(run_id: &RunId) -> String {
    format!("ltuas-result-{}.json", run_id.short())
}

/// Write a result payload as pretty JSON into `dir`
pub async fn export_result(dir: &Path, run_id: &RunId, raw: &serde_json::Value) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let path = dir.join(export_file_name(run_id));
    let json = serde_json::to_string_pretty(raw).context("Failed to serialize result")?;

    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write result file: {}", path.display()))?;

    info!(path = %path.display(), "Result exported");
    Ok(path)
}
