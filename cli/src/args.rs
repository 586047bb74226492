use std::path::PathBuf;

use clap::{Parser, Subcommand};
use voice_transcribe_common::client::DEFAULT_URL;

#[derive(Debug, Parser)]
#[command(name = "vtctl")]
#[command(about = "voice-transcribe CLI - talk to the transcription server")]
#[command(version)]
pub struct Cli {
    /// Base URL of the transcription server
    #[arg(long, global = true, env = "WHISPER_API_URL", default_value = DEFAULT_URL)]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show server health, model and device
    Health,
    /// Transcribe an audio file through the server
    Transcribe {
        /// WAV file to send
        file: PathBuf,
        /// Language code; omit or pass "auto" to detect
        #[arg(long, short)]
        language: Option<String>,
        /// "transcribe" or "translate"
        #[arg(long, short)]
        task: Option<String>,
        /// Print the full JSON response instead of just the text
        #[arg(long)]
        json: bool,
    },
    /// Download the Whisper and VAD models ahead of time
    Download {
        /// Whisper model; defaults to the server configuration
        #[arg(long, short)]
        model: Option<String>,
        /// Compute type selecting the model variant; defaults to the server configuration
        #[arg(long)]
        compute_type: Option<String>,
        /// Directory to store models in; defaults to the server configuration
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
}

#[cfg(test)]
#[path = "args_test.rs"]
mod tests;
