//! End-to-end test of the HTTP service lifecycle.
//!
//! Starts the server in-process on an ephemeral port with stub model
//! components, then drives it through the shared HTTP client.

use std::io::Cursor;
use std::sync::Arc;

use voice_transcribe_common::api::TranscribeRequest;
use voice_transcribe_common::client::Client;
use voice_transcribe_server::engine::Engine;
use voice_transcribe_server::server::{self, AppState};
use voice_transcribe_server::transcribe::{TranscribeOptions, Transcriber, Transcript};
use voice_transcribe_server::vad::SpeechFilter;

struct EchoTranscriber;

impl Transcriber for EchoTranscriber {
    fn transcribe(&self, audio: &[f32], options: &TranscribeOptions) -> anyhow::Result<Transcript> {
        Ok(Transcript {
            segments: vec![format!(" {} samples ", audio.len())],
            language: options.language.clone().unwrap_or_else(|| "en".to_string()),
        })
    }
}

struct KeepAll;

impl SpeechFilter for KeepAll {
    fn filter(&self, audio: &[f32]) -> anyhow::Result<Vec<f32>> {
        Ok(audio.to_vec())
    }
}

fn wav_bytes(sample_rate: u32, samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..samples {
            writer.write_sample((i % 64) as i16 * 100).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[tokio::test]
async fn test_http_lifecycle() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState {
        engine: Engine::new(Arc::new(EchoTranscriber), Arc::new(KeepAll)),
        model: "tiny".to_string(),
        device: "cpu".to_string(),
        temp_dir: Some(temp_dir.path().to_path_buf()),
    });
    let router = server::router(state, 8 << 20);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = tokio_util::sync::CancellationToken::new();
    let handle = tokio::spawn(server::serve(listener, router, shutdown.clone()));

    let client = Client::new(format!("http://{addr}"));

    // 1. Health reports the configured model and device
    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.model, "tiny");
    assert_eq!(health.device, "cpu");

    // 2. Transcribe with auto-detected language
    let request = TranscribeRequest::from_audio(&wav_bytes(16000, 8000));
    let response = client.transcribe(&request).await.unwrap();
    assert_eq!(response.text, "8000 samples");
    assert_eq!(response.language, "en");
    assert!((response.duration - 0.5).abs() < 1e-9);

    // 3. Explicit language, data-URI payload, resampled input
    let mut request = TranscribeRequest::from_audio(&wav_bytes(8000, 8000)).with_language("it");
    request.audio_base64 = format!("data:audio/wav;base64,{}", request.audio_base64);
    let response = client.transcribe(&request).await.unwrap();
    assert_eq!(response.language, "it");
    assert!((response.duration - 1.0).abs() < 1e-9);

    // 4. Client errors surface the server's detail
    let err = client
        .transcribe(&TranscribeRequest::default())
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("audio_base64 is required"),
        "unexpected error: {err}"
    );

    // 5. No request left a file behind
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);

    // 6. Graceful shutdown
    shutdown.cancel();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("Server did not stop within timeout")
        .unwrap();
    assert!(result.is_ok(), "Server returned error: {:?}", result.err());
    assert!(!client.is_server_running().await);
}
