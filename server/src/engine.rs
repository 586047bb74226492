//! Transcription engine shared by all requests.
//!
//! The engine owns and orchestrates:
//! - Decoding the uploaded audio file
//! - Resampling to 16kHz
//! - Voice activity filtering
//! - Speech-to-text transcription

use crate::audio::{self, TARGET_SAMPLE_RATE};
use crate::config::ModelConfig;
use crate::models::{ModelId, ModelManager, ModelSource, resolve_whisper_model};
use crate::transcribe::{Device, TranscribeOptions, Transcriber, WhisperTranscriber};
use crate::vad::{SileroSpeechFilter, SpeechFilter, VadConfig};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Language reported when the filter leaves no speech and none was requested.
const FALLBACK_LANGUAGE: &str = "en";

/// Result of transcribing one audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: String,
    /// Duration of the decoded audio in seconds, before VAD filtering.
    pub duration: f64,
}

/// Loaded model components, cheap to clone and safe to share.
#[derive(Clone)]
pub struct Engine {
    transcriber: Arc<dyn Transcriber>,
    speech_filter: Arc<dyn SpeechFilter>,
}

impl Engine {
    /// Create an engine from already-loaded components.
    pub fn new(transcriber: Arc<dyn Transcriber>, speech_filter: Arc<dyn SpeechFilter>) -> Self {
        Self {
            transcriber,
            speech_filter,
        }
    }

    /// Resolve, download if needed, and load the configured models.
    pub async fn load(config: &ModelConfig, models: &ModelManager) -> Result<Self> {
        info!(
            model = %config.name,
            device = %config.device,
            compute_type = %config.compute_type,
            "Initializing engine"
        );

        let device: Device = config.device.parse()?;

        let whisper_path = match resolve_whisper_model(&config.name, &config.compute_type)? {
            ModelSource::Local(path) => path,
            ModelSource::Managed(model) => models
                .ensure_model(model)
                .await
                .context("Failed to ensure Whisper model")?,
        };

        let vad_path = models
            .ensure_model(ModelId::SileroVad)
            .await
            .context("Failed to ensure VAD model")?;

        let threads = config.threads();
        let (transcriber, speech_filter) = tokio::task::spawn_blocking(move || {
            let transcriber = WhisperTranscriber::new(&whisper_path, device, threads)
                .context("Failed to initialize Whisper")?;
            let speech_filter = SileroSpeechFilter::new(vad_path, VadConfig::offline())
                .context("Failed to initialize VAD")?;
            anyhow::Ok((transcriber, speech_filter))
        })
        .await
        .context("Model loading task panicked")??;

        info!("Engine initialized");

        Ok(Self::new(Arc::new(transcriber), Arc::new(speech_filter)))
    }

    /// Transcribe a WAV file. Blocking; run it off the async executor.
    pub fn transcribe_file(
        &self,
        path: &Path,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult> {
        let started = Instant::now();

        let decoded = audio::read_wav(path)?;
        let duration = decoded.duration_secs();
        let audio = decoded.resampled(TARGET_SAMPLE_RATE)?;

        let speech = self
            .speech_filter
            .filter(&audio.samples)
            .context("Voice activity detection failed")?;

        if speech.is_empty() {
            debug!(duration_secs = duration, "No speech detected");
            let language = options
                .language
                .clone()
                .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());
            return Ok(TranscriptionResult {
                text: String::new(),
                language,
                duration,
            });
        }

        let transcript = self.transcriber.transcribe(&speech, options)?;
        let text = transcript.text();

        info!(
            duration_secs = duration,
            language = %transcript.language,
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transcription complete"
        );

        Ok(TranscriptionResult {
            text,
            language: transcript.language,
            duration,
        })
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
