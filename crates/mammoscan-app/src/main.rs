//! Mammoscan: mammogram upload and AI analysis demo client.
//! Entry point for the `mammoscan` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mammoscan_app::files::read_image;
use mammoscan_app::render;
use mammoscan_app::{AnalysisStatus, App, Config, UploadOutcome};
use mammoscan_client::{HttpImagingClient, ImagingApi};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mammoscan", version, about = "Upload a mammogram and view its AI analysis")]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000/api. A value starting
    /// with `/` replaces only the path.
    #[arg(long, global = true, env = "MAMMOSCAN_API_URL")]
    api_url: Option<String>,

    /// Path to mammoscan.toml
    #[arg(long, global = true, env = "MAMMOSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detailed backend health
    Health,
    /// Metadata of the analysis model
    ModelInfo,
    /// Upload an image and print its study id
    Upload { file: PathBuf },
    /// Upload status of a study
    Status { study_id: String },
    /// Show the analysis of a study, if there is one
    #[command(name = "result")]
    ShowResult { study_id: String },
    /// Start analysis of an uploaded study
    Analyze { study_id: String },
    /// Upload an image, analyse it and print the result
    Run { file: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> mammoscan_common::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail_on_error(app: &App) -> anyhow::Result<()> {
    match app.error() {
        Some(message) => Err(anyhow::anyhow!("{message}")),
        None => Ok(()),
    }
}

/// Draw the upload progress bar on stderr until aborted.
fn spawn_progress_bar(app: &App) -> JoinHandle<()> {
    let mut progress = app.upload_progress();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            eprint!("\r{}", render::progress_bar(value));
        }
    })
}

async fn upload(app: &mut App, path: &Path, json: bool) -> anyhow::Result<()> {
    let file = read_image(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    info!(file = %file.filename, content_type = %file.content_type, size = file.size(), "uploading");

    let bar = (!json).then(|| spawn_progress_bar(app));
    let outcome = app.upload(file).await;
    if let Some(bar) = bar {
        bar.abort();
        eprintln!();
    }

    if let UploadOutcome::Uploaded(resp) = &outcome {
        if json {
            print_json(resp)?;
        } else {
            print!("{}", render::render_upload(resp));
        }
    }
    fail_on_error(app)
}

fn print_results(app: &App, json: bool) -> anyhow::Result<()> {
    let Some(snapshot) = app.results_snapshot() else {
        return Ok(());
    };
    if json {
        print_json(&snapshot)?;
    } else {
        print!("{}", render::render_results(&snapshot));
    }
    Ok(())
}

async fn analyze(app: &mut App, json: bool) -> anyhow::Result<()> {
    let already_done = app
        .results()
        .map(|r| r.status() == AnalysisStatus::Completed)
        .unwrap_or(false);
    if !already_done {
        if !json {
            eprintln!("Analyzing...");
        }
        app.start_analysis().await;
    }
    print_results(app, json)?;
    fail_on_error(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let client_config = config.client_config(cli.api_url.as_deref());
    debug!(base_url = %client_config.base_url, "using backend");
    let api: Arc<dyn ImagingApi> = Arc::new(HttpImagingClient::new(&client_config)?);
    let mut app = App::new(api.clone(), config.upload_settings());

    match cli.command {
        Command::Health => {
            let health = app.mount().await;
            if cli.json {
                print_json(health)?;
            } else {
                print!("{}", render::render_health(health));
            }
        }
        Command::ModelInfo => {
            let info = api.get_model_info().await?;
            if cli.json {
                print_json(&info)?;
            } else {
                print!("{}", render::render_model_info(&info));
            }
        }
        Command::Upload { file } => upload(&mut app, &file, cli.json).await?,
        Command::Status { study_id } => {
            let status = api.get_upload_status(&study_id).await?;
            if cli.json {
                print_json(&status)?;
            } else {
                print!("{}", render::render_upload(&status));
            }
        }
        Command::ShowResult { study_id } => {
            app.open_study(&study_id).await;
            print_results(&app, cli.json)?;
        }
        Command::Analyze { study_id } => {
            app.open_study(&study_id).await;
            analyze(&mut app, cli.json).await?;
        }
        Command::Run { file } => {
            let health = app.mount().await;
            if !cli.json {
                eprint!("{}", render::render_health(health));
            }
            upload(&mut app, &file, cli.json).await?;
            analyze(&mut app, cli.json).await?;
        }
    }

    Ok(())
}
