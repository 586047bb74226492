//! Audio decoding and processing.
//!
//! Reads uploaded WAV files and converts them to 16kHz mono for speech recognition.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::SequentialSliceOfVecs;
use rubato::audioadapter::Adapter;
use rubato::{Fft, FixedSync, Resampler};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Target sample rate for speech recognition models.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Input chunk size used when resampling whole files.
const RESAMPLE_CHUNK: usize = 1024;

/// Audio buffer containing mono f32 samples at a known sample rate.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of the buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Convert to `target_rate`, returning the buffer unchanged if it already matches.
    pub fn resampled(self, target_rate: u32) -> Result<Self> {
        if self.sample_rate == target_rate {
            return Ok(self);
        }
        if self.samples.is_empty() {
            return Ok(Self::new(Vec::new(), target_rate));
        }

        debug!(
            from = self.sample_rate,
            to = target_rate,
            samples = self.samples.len(),
            "Resampling audio"
        );

        let mut resampler = AudioResampler::new(self.sample_rate, target_rate, RESAMPLE_CHUNK)?;
        let chunk = resampler.chunk_size();
        let delay = resampler.output_delay();

        // Zero-pad so the delayed tail is flushed and the input is whole chunks
        let original_len = self.samples.len();
        let flush = (delay as u64 * self.sample_rate as u64).div_ceil(target_rate as u64) as usize;
        let mut input = self.samples;
        input.resize((original_len + flush + chunk).div_ceil(chunk) * chunk, 0.0);

        let mut output = resampler.process(&input)?;
        output.drain(..delay.min(output.len()));
        let expected = (original_len as u64 * target_rate as u64)
            .div_ceil(self.sample_rate as u64) as usize;
        output.truncate(expected);

        Ok(Self::new(output, target_rate))
    }
}

/// Read a WAV file into a mono buffer at its native sample rate.
pub fn read_wav(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open audio file {}", path.display()))?;
    decode_wav(reader)
}

/// Decode all samples of a WAV stream, downmixed to mono in `[-1.0, 1.0]`.
pub fn decode_wav<R: Read>(mut reader: hound::WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();

    if spec.sample_rate == 0 || spec.channels == 0 {
        anyhow::bail!(
            "Invalid WAV header: {} Hz, {} channels",
            spec.sample_rate,
            spec.channels
        );
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to read WAV samples")?,
        hound::SampleFormat::Int => {
            if !(1..=32).contains(&spec.bits_per_sample) {
                anyhow::bail!("Unsupported WAV bit depth: {}", spec.bits_per_sample);
            }
            let max_val = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .context("Failed to read WAV samples")?
        }
    };

    debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        frames = samples.len() / spec.channels as usize,
        "Decoded WAV audio"
    );

    Ok(AudioBuffer::new(
        to_mono(&samples, spec.channels),
        spec.sample_rate,
    ))
}

/// Whether `bytes` start with a RIFF/WAVE header.
pub fn looks_like_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Convert multi-channel interleaved samples to mono by averaging all channels.
pub fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resampler for converting audio between sample rates.
pub struct AudioResampler {
    resampler: Fft<f32>,
    chunk_size_in: usize,
    chunk_size_out: usize,
}

impl AudioResampler {
    /// Create a new resampler.
    ///
    /// # Arguments
    /// * `input_rate` - Input sample rate in Hz
    /// * `output_rate` - Output sample rate in Hz
    /// * `chunk_size` - Number of input samples per processing chunk
    pub fn new(input_rate: u32, output_rate: u32, chunk_size: usize) -> Result<Self> {
        let resampler = Fft::new(
            input_rate as usize,
            output_rate as usize,
            chunk_size,
            1, // sub_chunks
            1, // channels
            FixedSync::Input,
        )
        .context("Failed to create resampler")?;

        let chunk_size_out = resampler.output_frames_max();

        Ok(Self {
            resampler,
            chunk_size_in: chunk_size,
            chunk_size_out,
        })
    }

    /// Resample audio data. Input length must be a multiple of chunk_size.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let mut output = Vec::with_capacity(
            input.len() / self.chunk_size_in * self.chunk_size_out,
        );

        for chunk in input.chunks_exact(self.chunk_size_in) {
            let input_vecs = vec![chunk.to_vec()];
            let input_adapter = SequentialSliceOfVecs::new(&input_vecs, 1, chunk.len())
                .context("Failed to wrap resampler input")?;
            let resampled = self
                .resampler
                .process(&input_adapter, 0, None)
                .context("Resampling failed")?;

            for frame_idx in 0..resampled.frames() {
                output.push(resampled.read_sample(0, frame_idx).unwrap_or(0.0));
            }
        }

        Ok(output)
    }

    /// Get the required input chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    /// Output frames the filter lags behind the input.
    pub fn output_delay(&self) -> usize {
        self.resampler.output_delay()
    }

    /// Get the output chunk size for a given input chunk.
    pub fn output_chunk_size(&self) -> usize {
        self.chunk_size_out
    }
}

#[cfg(test)]
#[path = "audio_test.rs"]
mod tests;
