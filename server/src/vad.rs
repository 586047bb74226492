//! Voice Activity Detection using Silero VAD.
//!
//! Detects speech in decoded audio using the Silero VAD ONNX model and
//! drops the non-speech regions before transcription.

use anyhow::{Context, Result};
use ndarray::{Array0, Array2, Array3};
use ort::session::Session;
use ort::value::TensorRef;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// LSTM hidden state size for Silero VAD.
const LSTM_HIDDEN_SIZE: usize = 128;

/// Context size for 16kHz audio (prepended to each chunk).
const CONTEXT_SIZE_16K: usize = 64;

/// Sample rate expected by Silero VAD.
pub const VAD_SAMPLE_RATE: u32 = 16000;

/// Supported chunk sizes for Silero VAD (in samples at 16kHz).
pub const VAD_CHUNK_SIZES: [usize; 3] = [512, 1024, 1536];

/// Default speech probability threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// VAD event indicating speech state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    /// Speech started.
    SpeechStart,
    /// Speech ended.
    SpeechEnd,
}

/// Configuration for the VAD state machine.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Probability threshold for considering audio as speech.
    pub threshold: f32,
    /// Minimum consecutive speech chunks before triggering SpeechStart.
    pub min_speech_chunks: usize,
    /// Minimum consecutive silence chunks before triggering SpeechEnd.
    pub min_silence_chunks: usize,
    /// Samples of context kept on each side of a speech region.
    pub speech_pad_samples: usize,
}

impl VadConfig {
    /// Settings for filtering a complete recording: any speech chunk counts,
    /// regions end after ~2s of silence and keep 400ms of padding.
    pub fn offline() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_speech_chunks: 1,
            min_silence_chunks: 62,
            speech_pad_samples: 6400,
        }
    }
}

/// State machine for tracking speech/silence transitions.
#[derive(Debug)]
pub struct VadStateMachine {
    config: VadConfig,
    is_speaking: bool,
    speech_chunk_count: usize,
    silence_chunk_count: usize,
}

impl VadStateMachine {
    /// Create a new VAD state machine.
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            is_speaking: false,
            speech_chunk_count: 0,
            silence_chunk_count: 0,
        }
    }

    /// Process a speech probability and return any state change event.
    pub fn process(&mut self, probability: f32) -> Option<VadEvent> {
        let is_speech = probability >= self.config.threshold;

        trace!(
            probability = probability,
            threshold = self.config.threshold,
            is_speech = is_speech,
            speaking = self.is_speaking,
            speech_chunks = self.speech_chunk_count,
            silence_chunks = self.silence_chunk_count,
            "VAD state machine processing"
        );

        if is_speech {
            self.speech_chunk_count += 1;
            self.silence_chunk_count = 0;

            if !self.is_speaking && self.speech_chunk_count >= self.config.min_speech_chunks {
                self.is_speaking = true;
                return Some(VadEvent::SpeechStart);
            }
        } else {
            self.silence_chunk_count += 1;
            self.speech_chunk_count = 0;

            if self.is_speaking && self.silence_chunk_count >= self.config.min_silence_chunks {
                self.is_speaking = false;
                return Some(VadEvent::SpeechEnd);
            }
        }

        None
    }

    /// Check if currently in speaking state.
    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }
}

/// Turn per-chunk speech probabilities into padded, merged sample ranges.
pub fn speech_ranges(
    probabilities: &[f32],
    config: &VadConfig,
    chunk_size: usize,
    total_samples: usize,
) -> Vec<Range<usize>> {
    let mut state_machine = VadStateMachine::new(config.clone());
    let mut ranges = Vec::new();
    let mut start = None;

    for (i, &probability) in probabilities.iter().enumerate() {
        match state_machine.process(probability) {
            Some(VadEvent::SpeechStart) => {
                // Speech began at the first chunk of the run that triggered the event
                let first = (i + 1).saturating_sub(config.min_speech_chunks.max(1));
                start = Some(first * chunk_size);
            }
            Some(VadEvent::SpeechEnd) => {
                if let Some(begin) = start.take() {
                    let first_silent = (i + 1).saturating_sub(config.min_silence_chunks.max(1));
                    ranges.push(begin..(first_silent * chunk_size).min(total_samples));
                }
            }
            None => {}
        }
    }

    if let Some(begin) = start {
        ranges.push(begin..total_samples);
    }

    pad_and_merge(ranges, config.speech_pad_samples, total_samples)
}

fn pad_and_merge(ranges: Vec<Range<usize>>, pad: usize, total: usize) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());

    for range in ranges {
        let start = range.start.saturating_sub(pad).min(total);
        let end = range.end.saturating_add(pad).min(total);
        if start >= end {
            continue;
        }
        match merged.last_mut() {
            Some(last) if start <= last.end => last.end = last.end.max(end),
            _ => merged.push(start..end),
        }
    }

    merged
}

/// Concatenate the samples covered by `ranges`.
pub fn collect_ranges(audio: &[f32], ranges: &[Range<usize>]) -> Vec<f32> {
    let len = ranges.iter().map(|r| r.len()).sum();
    let mut speech = Vec::with_capacity(len);
    for range in ranges {
        speech.extend_from_slice(&audio[range.clone()]);
    }
    speech
}

/// Removes non-speech audio before transcription.
pub trait SpeechFilter: Send + Sync {
    /// Return only the speech portions of 16kHz mono `audio`.
    fn filter(&self, audio: &[f32]) -> Result<Vec<f32>>;
}

/// [`SpeechFilter`] backed by the Silero VAD model.
///
/// The detector carries recurrent state, so every call gets a fresh one.
pub struct SileroSpeechFilter {
    model_path: PathBuf,
    config: VadConfig,
}

impl SileroSpeechFilter {
    /// Validate that the model loads and keep its path for later calls.
    pub fn new(model_path: impl Into<PathBuf>, config: VadConfig) -> Result<Self> {
        let model_path = model_path.into();
        VoiceActivityDetector::new(&model_path)?;
        Ok(Self { model_path, config })
    }
}

impl SpeechFilter for SileroSpeechFilter {
    fn filter(&self, audio: &[f32]) -> Result<Vec<f32>> {
        let mut vad = VoiceActivityDetector::new(&self.model_path)?;
        let chunk_size = vad.chunk_size();

        let mut probabilities = Vec::with_capacity(audio.len().div_ceil(chunk_size));
        let mut tail = vec![0.0f32; chunk_size];
        for chunk in audio.chunks(chunk_size) {
            let probability = if chunk.len() == chunk_size {
                vad.process_chunk(chunk)?
            } else {
                tail[..chunk.len()].copy_from_slice(chunk);
                vad.process_chunk(&tail)?
            };
            probabilities.push(probability);
        }

        let ranges = speech_ranges(&probabilities, &self.config, chunk_size, audio.len());
        let speech = collect_ranges(audio, &ranges);

        debug!(
            regions = ranges.len(),
            input_secs = audio.len() as f32 / VAD_SAMPLE_RATE as f32,
            speech_secs = speech.len() as f32 / VAD_SAMPLE_RATE as f32,
            "VAD filter applied"
        );

        Ok(speech)
    }
}

/// Voice Activity Detector using Silero VAD ONNX model.
///
/// Produces one speech probability per fixed-size chunk. The recurrent state
/// carries over between chunks, so one detector serves one audio stream.
pub struct VoiceActivityDetector {
    session: Session,
    /// LSTM state: shape (2, 1, 128) - combines h and c states.
    state: Array3<f32>,
    /// Audio context from previous chunk (64 samples at 16kHz).
    context: Vec<f32>,
    chunk_size: usize,
}

impl VoiceActivityDetector {
    /// Load the Silero VAD model from the given path.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_chunk_size(model_path, 512)
    }

    /// Load the model with a specific chunk size.
    pub fn with_chunk_size(model_path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        if !VAD_CHUNK_SIZES.contains(&chunk_size) {
            anyhow::bail!(
                "Invalid chunk size {}. Must be one of {:?}",
                chunk_size,
                VAD_CHUNK_SIZES
            );
        }

        trace!(
            path = %model_path.as_ref().display(),
            chunk_size = chunk_size,
            "Loading VAD model"
        );

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .with_intra_threads(1)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path.as_ref())
            .with_context(|| {
                format!(
                    "Failed to load VAD model from {}",
                    model_path.as_ref().display()
                )
            })?;

        // Initialize LSTM state: (2, batch=1, hidden_size=128)
        let state = Array3::<f32>::zeros((2, 1, LSTM_HIDDEN_SIZE));
        let context = vec![0.0f32; CONTEXT_SIZE_16K];

        Ok(Self {
            session,
            state,
            context,
            chunk_size,
        })
    }

    /// Process an audio chunk and return the speech probability.
    /// Audio must be f32 samples at 16kHz, mono.
    pub fn process_chunk(&mut self, audio: &[f32]) -> Result<f32> {
        if audio.len() != self.chunk_size {
            anyhow::bail!(
                "Audio chunk size {} doesn't match expected {}",
                audio.len(),
                self.chunk_size
            );
        }

        // Prepend context to audio input (required by Silero VAD)
        let mut input_with_context = self.context.clone();
        input_with_context.extend_from_slice(audio);

        let audio_array =
            Array2::from_shape_vec((1, self.chunk_size + CONTEXT_SIZE_16K), input_with_context)
                .context("Failed to create audio array")?;
        let sr_array = Array0::from_elem((), VAD_SAMPLE_RATE as i64);

        let input_tensor = TensorRef::from_array_view(&audio_array)?;
        let sr_tensor = TensorRef::from_array_view(&sr_array)?;
        let state_tensor = TensorRef::from_array_view(&self.state)?;

        let outputs = self
            .session
            .run(ort::inputs![
                "input" => input_tensor,
                "sr" => sr_tensor,
                "state" => state_tensor
            ])
            .context("VAD inference failed")?;

        // Update context with last 64 samples for next chunk
        self.context = audio[audio.len() - CONTEXT_SIZE_16K..].to_vec();

        let (_, output_data) = outputs["output"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;
        let probability = output_data.first().copied().unwrap_or(0.0);

        trace!(probability = probability, "VAD inference complete");

        let (_, state_data) = outputs["stateN"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract state tensor")?;

        self.state = Array3::from_shape_vec((2, 1, LSTM_HIDDEN_SIZE), state_data.to_vec())
            .context("Failed to reshape state")?;

        Ok(probability)
    }

    /// Get the expected chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
#[path = "vad_test.rs"]
mod tests;
