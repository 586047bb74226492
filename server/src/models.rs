//! Model download and management.
//!
//! Resolves the configured model name and compute type to a GGML file,
//! downloading it on first use.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const WHISPER_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

const SILERO_VAD_URL: &str =
    "https://github.com/snakers4/silero-vad/raw/master/src/silero_vad/data/silero_vad.onnx";

/// Whisper model sizes published as GGML files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperSize {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV1,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
}

impl WhisperSize {
    /// Name used in GGML filenames, e.g. `tiny.en` in `ggml-tiny.en.bin`.
    pub fn stem(&self) -> &'static str {
        match self {
            WhisperSize::Tiny => "tiny",
            WhisperSize::TinyEn => "tiny.en",
            WhisperSize::Base => "base",
            WhisperSize::BaseEn => "base.en",
            WhisperSize::Small => "small",
            WhisperSize::SmallEn => "small.en",
            WhisperSize::Medium => "medium",
            WhisperSize::MediumEn => "medium.en",
            WhisperSize::LargeV1 => "large-v1",
            WhisperSize::LargeV2 => "large-v2",
            WhisperSize::LargeV3 => "large-v3",
            WhisperSize::LargeV3Turbo => "large-v3-turbo",
        }
    }

    /// Size of the full-precision file, where known.
    fn full_precision_bytes(&self) -> Option<u64> {
        match self {
            WhisperSize::Tiny => Some(77_691_713),
            WhisperSize::TinyEn => Some(77_704_715),
            WhisperSize::Base => Some(147_951_465),
            WhisperSize::BaseEn => Some(147_964_211),
            WhisperSize::Small => Some(487_601_967),
            WhisperSize::SmallEn => Some(487_614_201),
            WhisperSize::MediumEn => Some(1_533_774_781),
            WhisperSize::LargeV3Turbo => Some(1_624_592_891),
            WhisperSize::Medium
            | WhisperSize::LargeV1
            | WhisperSize::LargeV2
            | WhisperSize::LargeV3 => None,
        }
    }
}

impl FromStr for WhisperSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let size = match s.trim().to_ascii_lowercase().as_str() {
            "tiny" => WhisperSize::Tiny,
            "tiny.en" => WhisperSize::TinyEn,
            "base" => WhisperSize::Base,
            "base.en" => WhisperSize::BaseEn,
            "small" => WhisperSize::Small,
            "small.en" => WhisperSize::SmallEn,
            "medium" => WhisperSize::Medium,
            "medium.en" => WhisperSize::MediumEn,
            "large-v1" => WhisperSize::LargeV1,
            "large-v2" => WhisperSize::LargeV2,
            "large" | "large-v3" => WhisperSize::LargeV3,
            "turbo" | "large-v3-turbo" => WhisperSize::LargeV3Turbo,
            other => anyhow::bail!("Unknown Whisper model {:?}", other),
        };
        Ok(size)
    }
}

/// Weight precision of a GGML file, selected by the configured compute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantization {
    /// Unquantized (f16) weights.
    #[default]
    Full,
    Q8_0,
    Q5_0,
}

impl Quantization {
    fn suffix(&self) -> &'static str {
        match self {
            Quantization::Full => "",
            Quantization::Q8_0 => "-q8_0",
            Quantization::Q5_0 => "-q5_0",
        }
    }
}

impl FromStr for Quantization {
    type Err = anyhow::Error;

    /// Parse a compute type such as `float16` or `int8_float16`.
    fn from_str(s: &str) -> Result<Self> {
        let quantization = match s.trim().to_ascii_lowercase().as_str() {
            "default" | "auto" | "float16" | "float32" | "bfloat16" => Quantization::Full,
            "int8" | "int8_float16" | "int8_float32" | "int8_bfloat16" | "q8_0" => {
                Quantization::Q8_0
            }
            "int5" | "q5_0" => Quantization::Q5_0,
            other => anyhow::bail!("Unsupported compute type {:?}", other),
        };
        Ok(quantization)
    }
}

/// Identifier for downloadable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelId {
    /// Silero VAD model for voice activity detection.
    SileroVad,
    /// A Whisper GGML file.
    Whisper(WhisperSize, Quantization),
}

impl ModelId {
    /// Get model metadata.
    fn info(&self) -> ModelInfo {
        match self {
            ModelId::SileroVad => ModelInfo {
                filename: "silero_vad.onnx".to_string(),
                url: SILERO_VAD_URL.to_string(),
                size_bytes: Some(2_327_524),
            },
            ModelId::Whisper(size, quantization) => {
                let filename = format!("ggml-{}{}.bin", size.stem(), quantization.suffix());
                ModelInfo {
                    url: format!("{}/{}", WHISPER_BASE_URL, filename),
                    size_bytes: match quantization {
                        Quantization::Full => size.full_precision_bytes(),
                        _ => None,
                    },
                    filename,
                }
            }
        }
    }

    /// Filename the model is stored under.
    pub fn filename(&self) -> String {
        self.info().filename
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelId::SileroVad => write!(f, "silero-vad"),
            ModelId::Whisper(size, quantization) => {
                write!(f, "whisper-{}{}", size.stem(), quantization.suffix())
            }
        }
    }
}

/// Metadata for a downloadable model.
struct ModelInfo {
    /// Filename to save as.
    filename: String,
    /// Download URL.
    url: String,
    /// Expected file size for validation (optional).
    size_bytes: Option<u64>,
}

/// Where the Whisper weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// An existing file named directly in the configuration.
    Local(PathBuf),
    /// A model fetched into the models directory.
    Managed(ModelId),
}

/// Resolve a configured model name and compute type.
///
/// A name that points at an existing file is used as-is (the compute type
/// then only has to be valid); otherwise it must be a known Whisper size.
pub fn resolve_whisper_model(name: &str, compute_type: &str) -> Result<ModelSource> {
    let quantization: Quantization = compute_type.parse()?;

    let path = Path::new(name);
    if path.is_file() {
        return Ok(ModelSource::Local(path.to_path_buf()));
    }

    let size: WhisperSize = name
        .parse()
        .with_context(|| format!("{:?} is neither a model file nor a Whisper model name", name))?;
    Ok(ModelSource::Managed(ModelId::Whisper(size, quantization)))
}

/// Result of inspecting a model on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// File present with the expected size (or the size is unknown).
    Ready(PathBuf),
    Missing,
    /// File present but the wrong size; it will be re-downloaded.
    Corrupted { expected: u64, actual: u64 },
}

/// Progress of a running download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

/// Manages model downloads and storage.
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a ModelManager using the default models directory.
    ///
    /// Default: `~/.local/share/voice-transcribe/models/`
    pub fn new() -> Result<Self> {
        let models_dir = voice_transcribe_common::dirs::models_dir()?;
        Ok(Self { models_dir })
    }

    /// Create a ModelManager with a custom models directory.
    pub fn with_dir(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Get the models directory path.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Path the model is (or would be) stored at.
    pub fn model_path(&self, model: ModelId) -> PathBuf {
        self.models_dir.join(model.info().filename)
    }

    /// Inspect the model file without downloading anything.
    pub async fn check_model(&self, model: ModelId) -> ModelStatus {
        let info = model.info();
        let path = self.models_dir.join(&info.filename);

        let Ok(metadata) = fs::metadata(&path).await else {
            return ModelStatus::Missing;
        };

        match info.size_bytes {
            Some(expected) if metadata.len() != expected => ModelStatus::Corrupted {
                expected,
                actual: metadata.len(),
            },
            _ => ModelStatus::Ready(path),
        }
    }

    /// Ensure a model is available, downloading if necessary.
    ///
    /// Returns the path to the model file.
    pub async fn ensure_model(&self, model: ModelId) -> Result<PathBuf> {
        self.ensure_model_with_progress(model, |_| {}).await
    }

    /// Like [`ensure_model`](Self::ensure_model), reporting download progress.
    pub async fn ensure_model_with_progress(
        &self,
        model: ModelId,
        on_progress: impl Fn(DownloadProgress),
    ) -> Result<PathBuf> {
        let info = model.info();
        let model_path = self.models_dir.join(&info.filename);

        match self.check_model(model).await {
            ModelStatus::Ready(path) => {
                debug!(path = %path.display(), "Model already exists");
                return Ok(path);
            }
            ModelStatus::Corrupted { expected, actual } => {
                warn!(
                    model = %model,
                    expected = expected,
                    actual = actual,
                    "Model size mismatch, re-downloading"
                );
                fs::remove_file(&model_path)
                    .await
                    .context("Failed to remove corrupted model")?;
            }
            ModelStatus::Missing => {}
        }

        self.download_model(&info, &model_path, &on_progress)
            .await
            .with_context(|| format!("Failed to fetch model {}", model))?;
        Ok(model_path)
    }

    /// Stream a model from its URL into `dest`.
    async fn download_model(
        &self,
        info: &ModelInfo,
        dest: &Path,
        on_progress: &impl Fn(DownloadProgress),
    ) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create models directory")?;
        }

        info!(
            url = %info.url,
            dest = %dest.display(),
            "Downloading model"
        );

        let response = reqwest::get(&info.url)
            .await
            .with_context(|| format!("Failed to download model from {}", info.url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download model: HTTP {}", response.status());
        }

        let total = response.content_length().or(info.size_bytes);

        // Write to temporary file first, then rename (atomic)
        let temp_path = dest.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .context("Failed to create temporary model file")?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read response body")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write model file")?;
            downloaded += chunk.len() as u64;
            on_progress(DownloadProgress { downloaded, total });
        }
        file.sync_all().await.context("Failed to sync model file")?;

        if let Some(expected) = info.size_bytes
            && downloaded != expected
        {
            let _ = fs::remove_file(&temp_path).await;
            anyhow::bail!(
                "Downloaded model size mismatch: expected {}, got {}",
                expected,
                downloaded
            );
        }

        fs::rename(&temp_path, dest)
            .await
            .context("Failed to finalize model file")?;

        info!(
            path = %dest.display(),
            size = downloaded,
            "Model downloaded successfully"
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
