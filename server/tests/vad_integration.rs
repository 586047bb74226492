//! Integration tests for VAD that need the Silero model on disk.
//!
//! Run with `cargo test -- --ignored` after `vtctl download`, or point
//! `VAD_MODEL_PATH` at a `silero_vad.onnx`.

use std::path::PathBuf;

use voice_transcribe_server::models::{ModelId, ModelManager};
use voice_transcribe_server::vad::{
    SileroSpeechFilter, SpeechFilter, VAD_CHUNK_SIZES, VAD_SAMPLE_RATE, VadConfig,
    VoiceActivityDetector,
};

/// Get the VAD model path, checking VAD_MODEL_PATH env var first, then the managed models dir.
fn get_model_path() -> PathBuf {
    std::env::var_os("VAD_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            ModelManager::new()
                .expect("Failed to resolve models dir")
                .model_path(ModelId::SileroVad)
        })
}

#[test]
#[ignore = "requires the Silero VAD model"]
fn test_vad_with_silence() {
    let mut vad = VoiceActivityDetector::new(get_model_path()).expect("Failed to load VAD");

    let silence = vec![0.0f32; 512];
    let prob = vad.process_chunk(&silence).expect("VAD failed");

    assert!(prob < 0.3, "Silence detected as speech: {}", prob);
}

#[test]
#[ignore = "requires the Silero VAD model"]
fn test_vad_chunk_size_validation() {
    let model_path = get_model_path();

    for &size in &VAD_CHUNK_SIZES {
        let result = VoiceActivityDetector::with_chunk_size(&model_path, size);
        assert!(result.is_ok(), "Failed with valid chunk size {}", size);
    }

    let result = VoiceActivityDetector::with_chunk_size(&model_path, 100);
    assert!(result.is_err(), "Should reject invalid chunk size");
}

#[test]
#[ignore = "requires the Silero VAD model"]
fn test_vad_state_persistence() {
    let mut vad = VoiceActivityDetector::new(get_model_path()).expect("Failed to load VAD");

    let silence = vec![0.0f32; 512];
    for i in 0..5 {
        let prob = vad.process_chunk(&silence).expect("VAD failed");
        assert!(prob < 0.3, "Chunk {} detected as speech: {}", i, prob);
    }
}

#[test]
#[ignore = "requires the Silero VAD model"]
fn test_filter_drops_silence() {
    let filter =
        SileroSpeechFilter::new(get_model_path(), VadConfig::offline()).expect("Failed to load VAD");

    // Three seconds of silence, not a multiple of the chunk size
    let silence = vec![0.0f32; VAD_SAMPLE_RATE as usize * 3 + 123];
    let speech = filter.filter(&silence).expect("VAD failed");

    assert!(speech.is_empty(), "Kept {} samples of silence", speech.len());
}

#[test]
#[ignore = "requires the Silero VAD model"]
fn test_filter_is_reusable() {
    let filter =
        SileroSpeechFilter::new(get_model_path(), VadConfig::offline()).expect("Failed to load VAD");
    let silence = vec![0.0f32; 4096];

    // Every call starts from fresh detector state
    let first = filter.filter(&silence).expect("VAD failed");
    let second = filter.filter(&silence).expect("VAD failed");

    assert_eq!(first, second);
}
