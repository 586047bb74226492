pub mod args;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use voice_transcribe_common::api::TranscribeRequest;
use voice_transcribe_common::client::Client;
use voice_transcribe_server::config::Config;
use voice_transcribe_server::models::{
    DownloadProgress, ModelId, ModelManager, ModelSource, resolve_whisper_model,
};

use crate::args::{Cli, Commands};

/// Entry point for the CLI binary.
pub async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = Client::new(cli.url);

    match cli.command {
        Commands::Health => health(&client).await,
        Commands::Transcribe {
            file,
            language,
            task,
            json,
        } => transcribe(&client, &file, language, task, json).await,
        Commands::Download {
            model,
            compute_type,
            models_dir,
        } => download(model, compute_type, models_dir).await,
    }
}

async fn health(client: &Client) -> Result<()> {
    let health = client.health().await?;
    println!("Server:  {}", client.base_url());
    println!("Status:  {}", health.status);
    println!("Model:   {}", health.model);
    println!("Device:  {}", health.device);
    Ok(())
}

async fn transcribe(
    client: &Client,
    file: &Path,
    language: Option<String>,
    task: Option<String>,
    json: bool,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut request = TranscribeRequest::from_audio(&bytes);
    request.language = language;
    request.task = task;

    tracing::info!(file = %file.display(), bytes = bytes.len(), "Sending audio");
    let response = client.transcribe(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.text);
    }
    Ok(())
}

async fn download(
    model: Option<String>,
    compute_type: Option<String>,
    models_dir: Option<std::path::PathBuf>,
) -> Result<()> {
    let mut config = Config::load()?.model;
    if let Some(model) = model {
        config.name = model;
    }
    if let Some(compute_type) = compute_type {
        config.compute_type = compute_type;
    }
    if let Some(dir) = models_dir {
        config.models_dir = Some(dir);
    }

    let manager = ModelManager::with_dir(config.models_dir()?);
    println!("Models directory: {}", manager.models_dir().display());

    match resolve_whisper_model(&config.name, &config.compute_type)? {
        ModelSource::Local(path) => println!("Using local model file {}", path.display()),
        ModelSource::Managed(model) => fetch(&manager, model).await?,
    }
    fetch(&manager, ModelId::SileroVad).await
}

async fn fetch(manager: &ModelManager, model: ModelId) -> Result<()> {
    let bar = progress_bar(model);
    let path = manager
        .ensure_model_with_progress(model, |progress| update_bar(&bar, progress))
        .await;

    match path {
        Ok(path) => {
            bar.finish_and_clear();
            println!("{model}: {}", path.display());
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e)
        }
    }
}

fn progress_bar(model: ModelId) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{msg:>16} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");

    let bar = ProgressBar::new(0);
    bar.set_style(style);
    bar.set_message(model.to_string());
    bar
}

fn update_bar(bar: &ProgressBar, progress: DownloadProgress) {
    if let Some(total) = progress.total {
        bar.set_length(total);
    }
    bar.set_position(progress.downloaded);
}
