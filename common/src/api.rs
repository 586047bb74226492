//! JSON wire types for the transcription HTTP API.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Language value that asks the model to detect the spoken language.
pub const AUTO_LANGUAGE: &str = "auto";

/// Task used when the request does not name one.
pub const DEFAULT_TASK: &str = "transcribe";

/// Body of `POST /transcribe`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscribeRequest {
    /// Base64 audio, optionally prefixed with a data-URI header.
    #[serde(default)]
    pub audio_base64: String,
    /// Language code, or `"auto"` to let the model detect it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// `"transcribe"` or `"translate"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
}

impl TranscribeRequest {
    /// Build a request from raw audio file bytes.
    pub fn from_audio(bytes: &[u8]) -> Self {
        Self {
            audio_base64: STANDARD.encode(bytes),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Language to hand to the model: `None` means auto-detect.
    ///
    /// Missing, empty and `"auto"` all mean auto-detect; anything else is
    /// passed through untouched.
    pub fn language_hint(&self) -> Option<&str> {
        match self.language.as_deref() {
            None | Some("") | Some(AUTO_LANGUAGE) => None,
            Some(language) => Some(language),
        }
    }

    /// Task to hand to the model, defaulting to `"transcribe"`.
    pub fn task_or_default(&self) -> &str {
        match self.task.as_deref() {
            None | Some("") => DEFAULT_TASK,
            Some(task) => task,
        }
    }
}

/// Successful response of `POST /transcribe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub language: String,
    /// Audio duration in seconds.
    pub duration: f64,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: String,
}

impl HealthResponse {
    pub fn ok(model: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            model: model.into(),
            device: device.into(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
