//! Integration tests for the Whisper backend that need a GGML model on disk.
//!
//! Run with `cargo test -- --ignored` after `vtctl download --model tiny`, or
//! point `WHISPER_MODEL_PATH` at any `ggml-*.bin`.

use std::path::PathBuf;

use voice_transcribe_server::models::{ModelId, ModelManager, Quantization, WhisperSize};
use voice_transcribe_server::transcribe::{
    Device, TranscribeOptions, Transcriber, WhisperTranscriber,
};

/// Get the Whisper model path, checking WHISPER_MODEL_PATH first, then the managed `tiny` file.
fn get_model_path() -> PathBuf {
    std::env::var_os("WHISPER_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            ModelManager::new()
                .expect("Failed to resolve models dir")
                .model_path(ModelId::Whisper(WhisperSize::Tiny, Quantization::Full))
        })
}

fn load() -> WhisperTranscriber {
    WhisperTranscriber::new(get_model_path(), Device::Cpu, 2).expect("Failed to load Whisper")
}

fn silence(secs: usize) -> Vec<f32> {
    vec![0.0f32; 16000 * secs]
}

#[test]
#[ignore = "requires a Whisper model"]
fn test_silence_gives_little_or_no_text() {
    let whisper = load();

    let transcript = whisper
        .transcribe(&silence(2), &TranscribeOptions::default())
        .expect("Transcription failed");

    let text = transcript.text();
    assert!(text.len() < 40, "Unexpected text for silence: {:?}", text);
}

#[test]
#[ignore = "requires a Whisper model"]
fn test_auto_detect_reports_language_code() {
    let whisper = load();

    let transcript = whisper
        .transcribe(&silence(2), &TranscribeOptions::default())
        .expect("Transcription failed");

    let language = &transcript.language;
    assert!(
        (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_lowercase()),
        "Not a language code: {:?}",
        language
    );
}

#[test]
#[ignore = "requires a Whisper model"]
fn test_requested_language_is_reported() {
    let whisper = load();
    let options = TranscribeOptions {
        language: Some("de".to_string()),
        task: "translate".to_string(),
    };

    let transcript = whisper
        .transcribe(&silence(1), &options)
        .expect("Transcription failed");

    assert_eq!(transcript.language, "de");
}

#[test]
#[ignore = "requires a Whisper model"]
fn test_unknown_task_is_rejected() {
    let whisper = load();
    let options = TranscribeOptions {
        task: "summarize".to_string(),
        ..Default::default()
    };

    let err = whisper.transcribe(&silence(1), &options).unwrap_err();

    assert!(err.to_string().contains("summarize"));
}
