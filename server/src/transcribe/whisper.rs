//! Whisper transcription backend.
//!
//! Uses whisper.cpp via whisper-rs for speech-to-text.

use super::{Device, Task, TranscribeOptions, Transcriber, Transcript};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Beam width used for decoding.
const BEAM_SIZE: i32 = 5;

/// Whisper speech-to-text transcriber.
///
/// The context holds the model weights and is loaded once. Each call creates
/// its own inference state, so concurrent calls do not share decoder state.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
    threads: i32,
}

impl WhisperTranscriber {
    /// Load a Whisper model.
    ///
    /// # Arguments
    /// * `model_path` - Path to the Whisper GGML model file
    /// * `device` - Compute device to run on
    /// * `threads` - CPU threads per inference call
    pub fn new(model_path: impl AsRef<Path>, device: Device, threads: usize) -> Result<Self> {
        info!(
            path = %model_path.as_ref().display(),
            device = %device,
            threads = threads,
            "Loading Whisper model"
        );

        if device.use_gpu() && !Device::gpu_backend_available() {
            warn!(
                device = %device,
                "Built without a GPU backend feature, whisper.cpp will run on the CPU"
            );
        }

        let mut params = WhisperContextParameters::default();
        params.use_gpu(device.use_gpu());
        if let Device::Gpu { index } = device {
            params.gpu_device(index);
        }

        let ctx = WhisperContext::new_with_params(
            model_path.as_ref().to_str().context("Invalid model path")?,
            params,
        )
        .context("Failed to load Whisper model")?;

        info!("Whisper model loaded successfully");

        Ok(Self {
            ctx,
            threads: i32::try_from(threads.max(1)).unwrap_or(i32::MAX),
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[f32], options: &TranscribeOptions) -> Result<Transcript> {
        let task: Task = options.task.parse()?;

        debug!(
            samples = audio.len(),
            duration_secs = audio.len() as f32 / 16000.0,
            language = ?options.language,
            task = ?task,
            "Transcribing audio with Whisper"
        );

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: BEAM_SIZE,
            patience: -1.0,
        });

        // None means auto-detect
        params.set_language(options.language.as_deref());
        params.set_translate(task == Task::Translate);
        params.set_n_threads(self.threads);

        // Disable printing to stdout
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self
            .ctx
            .create_state()
            .context("Failed to create Whisper state")?;

        state.full(params, audio).context("Whisper inference failed")?;

        let num_segments = state.full_n_segments();
        let mut segments = Vec::new();

        for i in 0..num_segments {
            if let Some(segment) = state.get_segment(i) {
                let text = segment
                    .to_str_lossy()
                    .context("Failed to read segment text")?;
                segments.push(text.into_owned());
            }
        }

        let language = match &options.language {
            Some(language) => language.clone(),
            None => {
                let lang_id = state.full_lang_id_from_state();
                whisper_rs::get_lang_str(lang_id)
                    .context("Whisper reported an unknown language id")?
                    .to_string()
            }
        };

        debug!(
            segments = segments.len(),
            language = %language,
            "Transcription complete"
        );

        Ok(Transcript { segments, language })
    }
}
