//! Transcribe a WAV file in-process, without the HTTP layer.
//!
//! Run with: cargo run -p voice-transcribe-server --example transcribe_file -- clip.wav [language]
//!
//! Uses the same configuration as the server (config file plus WHISPER_*
//! env vars), so WHISPER_DEVICE=cpu WHISPER_MODEL=tiny is a quick start.
//!
//! Set RUST_LOG for debug output:
//!   RUST_LOG=info  - model loading and transcription results
//!   RUST_LOG=debug - VAD and timing details

use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use voice_transcribe_server::config::Config;
use voice_transcribe_server::engine::Engine;
use voice_transcribe_server::models::ModelManager;
use voice_transcribe_server::transcribe::TranscribeOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let file = PathBuf::from(args.next().context("usage: transcribe_file <FILE> [LANGUAGE]")?);
    let options = TranscribeOptions {
        language: args.next(),
        ..Default::default()
    };

    let config = Config::load()?;
    println!("Model:  {}", config.model.name);
    println!("Device: {}", config.model.device);
    println!();

    let models = ModelManager::with_dir(config.model.models_dir()?);
    let engine = Engine::load(&config.model, &models).await?;

    let result =
        tokio::task::spawn_blocking(move || engine.transcribe_file(&file, &options)).await??;

    println!(">>> {}", result.text);
    println!("Language: {}  Duration: {:.2}s", result.language, result.duration);
    Ok(())
}
