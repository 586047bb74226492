//! Configuration management for the transcription server.
//!
//! Settings come from an optional TOML file and are then overridden by
//! `WHISPER_*` environment variables. Both are read once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable overriding `model.name`.
pub const ENV_MODEL: &str = "WHISPER_MODEL";
/// Environment variable overriding `model.device`.
pub const ENV_DEVICE: &str = "WHISPER_DEVICE";
/// Environment variable overriding `model.compute_type`.
pub const ENV_COMPUTE_TYPE: &str = "WHISPER_COMPUTE_TYPE";
pub const ENV_MODELS_DIR: &str = "WHISPER_MODELS_DIR";
pub const ENV_THREADS: &str = "WHISPER_THREADS";
pub const ENV_LISTEN_ADDR: &str = "WHISPER_LISTEN_ADDR";
pub const ENV_TEMP_DIR: &str = "WHISPER_TEMP_DIR";
/// Path of an alternative config file.
pub const ENV_CONFIG: &str = "WHISPER_CONFIG";

/// Main configuration struct for the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub listen_addr: SocketAddr,
    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,
    /// Directory for per-request audio files. System temp dir if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

/// Configuration for the speech recognition model.
///
/// `name`, `device` and `compute_type` are kept as the exact strings the
/// operator supplied; `/health` reports them verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Whisper size name (e.g. "large-v3") or a path to a GGML model file.
    pub name: String,
    /// Compute device: "cpu", "cuda", "cuda:1", "metal", "auto".
    pub device: String,
    /// Numeric precision: "float16", "int8", ...
    pub compute_type: String,
    /// Where downloaded models are stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,
    /// Inference threads. Defaults to available parallelism, capped at 8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: LogLevel,
    /// Write logs to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to a tracing filter directive string for the server crate.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "voice_transcribe_server=error",
            LogLevel::Warn => "voice_transcribe_server=warn",
            LogLevel::Info => "voice_transcribe_server=info",
            LogLevel::Debug => "voice_transcribe_server=debug",
            LogLevel::Trace => "voice_transcribe_server=trace",
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            body_limit_bytes: 64 << 20,
            temp_dir: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "large-v3".to_string(),
            device: "cuda".to_string(),
            compute_type: "float16".to_string(),
            models_dir: None,
            threads: None,
        }
    }
}

impl ModelConfig {
    /// Resolved models directory.
    pub fn models_dir(&self) -> Result<PathBuf> {
        match &self.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => voice_transcribe_common::dirs::models_dir(),
        }
    }

    /// Resolved inference thread count.
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4)
        })
    }
}

impl Config {
    /// Returns the default config file path.
    /// `~/.config/voice-transcribe/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        voice_transcribe_common::dirs::config_path()
    }

    /// Load the config file (`WHISPER_CONFIG` or the default path) and apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(ENV_CONFIG) {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file as TOML")
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get(ENV_MODEL) {
            self.model.name = name;
        }
        if let Some(device) = get(ENV_DEVICE) {
            self.model.device = device;
        }
        if let Some(compute_type) = get(ENV_COMPUTE_TYPE) {
            self.model.compute_type = compute_type;
        }
        if let Some(dir) = get(ENV_MODELS_DIR) {
            self.model.models_dir = Some(PathBuf::from(dir));
        }
        if let Some(threads) = get(ENV_THREADS) {
            let threads = threads
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid {ENV_THREADS}: {threads:?}"))?;
            self.model.threads = Some(threads);
        }
        if let Some(addr) = get(ENV_LISTEN_ADDR) {
            self.server.listen_addr = addr
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_LISTEN_ADDR}: {addr:?}"))?;
        }
        if let Some(dir) = get(ENV_TEMP_DIR) {
            self.server.temp_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
