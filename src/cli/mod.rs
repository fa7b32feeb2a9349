//! Command-line interface for ltuas.
//!
//! Provides commands for submitting audio, following a run's node graph
//! until it settles, inspecting and cancelling runs, and exporting results.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::{BackendClient, StatusSource};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    export_result, load_results, Navigator, ResultsOutcome, RouterOutcome, RunSession,
    RunStatusProjector, RunView, Surface,
};
use crate::domain::{PipelineResult, RunId, RunSnapshot};
use crate::graph::PipelineGraph;
use crate::ingest::AudioUpload;

pub mod render;

/// ltuas - audio understanding pipeline client
#[derive(Parser, Debug)]
#[command(name = "ltuas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config and LTUAS_BACKEND_URL)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit an audio file and follow the run
    Run {
        /// Audio file (.wav, .mp3, .m4a, .flac, .ogg; max 50MB)
        audio: PathBuf,

        /// Optional prompt for the reasoning stage
        #[arg(short, long)]
        prompt: Option<String>,

        /// Print the run ID and exit without following the run
        #[arg(long)]
        no_wait: bool,
    },

    /// Follow an existing run until it settles
    Watch {
        /// Run ID
        run_id: String,
    },

    /// Show the current status of a run once
    Status {
        /// Run ID
        run_id: String,
    },

    /// Cancel a run
    Cancel {
        /// Run ID
        run_id: String,
    },

    /// Show the results of a finished run
    Result {
        /// Run ID
        run_id: String,

        /// Export the raw result JSON
        #[arg(short, long)]
        save: bool,

        /// Directory for the exported file (defaults to the configured results dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the pipeline topology
    Graph,

    /// Show resolved configuration (debug)
    Config,
}

/// Prints where the results view would open
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate_to_results(&self, run_id: &RunId, surface: Surface) {
        if surface == Surface::Dialog {
            info!("Closing run dialog");
        }
        eprintln!("\n[Run {} completed, loading results]", run_id);
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = config::config()?.clone();
        if let Some(url) = self.backend {
            config.backend_url = url;
        }

        match self.command {
            Commands::Run {
                audio,
                prompt,
                no_wait,
            } => submit_run(&config, audio, prompt, no_wait).await,
            Commands::Watch { run_id } => {
                watch_run(&config, RunId::new(run_id), Surface::Page).await
            }
            Commands::Status { run_id } => show_status(&config, RunId::new(run_id)).await,
            Commands::Cancel { run_id } => cancel_run(&config, RunId::new(run_id)).await,
            Commands::Result {
                run_id,
                save,
                output,
            } => show_result(&config, RunId::new(run_id), save, output).await,
            Commands::Graph => show_graph(),
            Commands::Config => show_config(&config),
        }
    }
}

/// Upload an audio file, then follow the new run
async fn submit_run(
    config: &ResolvedConfig,
    audio: PathBuf,
    prompt: Option<String>,
    no_wait: bool,
) -> Result<()> {
    let upload = AudioUpload::new(audio, prompt);
    upload
        .validate()
        .with_context(|| format!("Cannot submit {}", upload.path.display()))?;

    let client = BackendClient::from_config(config);
    let started = client
        .start_run(&upload)
        .await
        .context("Failed to start pipeline")?;

    if let Some(ref message) = started.message {
        eprintln!("{}", message);
    }
    println!("{}", started.run_id);

    if no_wait {
        return Ok(());
    }

    // The upload form opens the run in a dialog
    watch_run(config, started.run_id, Surface::Dialog).await
}

/// Follow a run, printing node changes until it settles
async fn watch_run(config: &ResolvedConfig, run_id: RunId, surface: Surface) -> Result<()> {
    let client: Arc<dyn StatusSource> = Arc::new(BackendClient::from_config(config));
    let graph = PipelineGraph::reference();

    let mut session = RunSession::open(
        run_id.clone(),
        Arc::clone(&client),
        Arc::new(ConsoleNavigator),
        config.poll_config(),
        surface,
    )?;

    let mut views = session.view();
    let printer = tokio::spawn(async move {
        let mut previous: Option<RunView> = None;
        loop {
            let view = views.borrow_and_update().clone();
            for line in render::diff_lines(&graph, previous.as_ref(), &view) {
                eprintln!("{}", line);
            }
            previous = Some(view);
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    let outcome = tokio::select! {
        outcome = session.wait() => outcome,
        _ = tokio::signal::ctrl_c() => None,
    };
    session.close();
    printer.abort();

    match outcome {
        Some(RouterOutcome::Navigated(run_id)) => print_results(client.as_ref(), &run_id).await,
        Some(RouterOutcome::Failed(message)) => {
            eprintln!(
                "\n[Run {} failed: {}]",
                run_id,
                message.unwrap_or_else(|| "unknown error".to_string())
            );
            std::process::exit(1);
        }
        Some(RouterOutcome::TornDown) | None => {
            eprintln!("\n[Stopped following run {}]", run_id);
            Ok(())
        }
    }
}

/// Load and print the results of a run
async fn print_results(source: &dyn StatusSource, run_id: &RunId) -> Result<()> {
    match load_results(source, run_id).await {
        ResultsOutcome::Ready { raw, parsed } => {
            print_result_body(&raw, parsed.as_ref())?;
            Ok(())
        }
        ResultsOutcome::Failed(message) => {
            anyhow::bail!("Error loading results: {}", message)
        }
    }
}

fn print_result_body(raw: &serde_json::Value, parsed: Option<&PipelineResult>) -> Result<()> {
    match parsed {
        Some(result) if !result.summary_lines().is_empty() => {
            for line in result.summary_lines() {
                println!("{}", line);
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(raw)?),
    }
    Ok(())
}

/// Show the status of a run
async fn show_status(config: &ResolvedConfig, run_id: RunId) -> Result<()> {
    let client = BackendClient::from_config(config);
    let response = client
        .fetch_status(&run_id)
        .await
        .with_context(|| format!("Failed to fetch status of run {}", run_id))?;

    let created_at = response.created_at.clone();
    let updated_at = response.updated_at.clone();

    let projector = RunStatusProjector::new(PipelineGraph::reference());
    projector.reset(run_id);
    projector.apply(&RunSnapshot::from_response(response));
    let view = projector.current();

    println!("{}", render::status_bar(&view));
    if !created_at.is_empty() {
        println!("Created: {}", created_at);
    }
    if !updated_at.is_empty() {
        println!("Updated: {}", updated_at);
    }
    if let Some(ref message) = view.error_message {
        println!("Error: {}", message);
    }
    println!("\nNodes:");
    for line in render::node_lines(projector.graph(), &view) {
        println!("{}", line);
    }

    if !view.logs.is_empty() {
        println!("\nLogs:");
        for entry in &view.logs {
            println!("  [{}] {}", entry.timestamp, entry.message);
        }
    }

    Ok(())
}

/// Cancel a run
async fn cancel_run(config: &ResolvedConfig, run_id: RunId) -> Result<()> {
    let client = BackendClient::from_config(config);
    client.cancel_run(&run_id).await?;
    println!("Cancelled run {}", run_id);
    Ok(())
}

/// Show (and optionally export) the results of a run
async fn show_result(
    config: &ResolvedConfig,
    run_id: RunId,
    save: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = BackendClient::from_config(config);

    match load_results(&client, &run_id).await {
        ResultsOutcome::Ready { raw, parsed } => {
            print_result_body(&raw, parsed.as_ref())?;
            if save {
                let dir = output.unwrap_or_else(|| config.results_dir.clone());
                let path = export_result(&dir, &run_id, &raw).await?;
                eprintln!("Saved {}", path.display());
            }
            Ok(())
        }
        ResultsOutcome::Failed(message) => {
            anyhow::bail!("Error loading results: {}", message)
        }
    }
}

/// Print the pipeline topology
fn show_graph() -> Result<()> {
    let graph = PipelineGraph::reference();
    graph.validate()?;

    for line in render::graph_lines(&graph) {
        println!("{}", line);
    }
    println!("\nExecution order: {}", graph.topological_order()?.join(" → "));

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("Backend URL:     {}", config.backend_url);
    println!("Poll interval:   {} ms", config.poll_interval_ms);
    println!("Settle delay:    {} ms", config.settle_delay_ms);
    println!("Results dir:     {}", config.results_dir.display());
    match config.config_file {
        Some(ref path) => println!("Config file:     {}", path.display()),
        None => println!("Config file:     (none)"),
    }
    Ok(())
}
