//! Speech-to-text transcription.
//!
//! This module provides a trait abstraction for transcription backends
//! and the whisper.cpp implementation.

use anyhow::Result;
use std::fmt;
use std::str::FromStr;

mod whisper;

pub use whisper::WhisperTranscriber;

/// Per-call inference options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
    /// Language code, or `None` to auto-detect.
    pub language: Option<String>,
    /// Task name as supplied by the client; backends decide what they accept.
    pub task: String,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: None,
            task: voice_transcribe_common::api::DEFAULT_TASK.to_string(),
        }
    }
}

/// Output of one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Segment texts in order, as returned by the model.
    pub segments: Vec<String>,
    /// Language the model used (requested or detected).
    pub language: String,
}

impl Transcript {
    /// Concatenate segments and trim surrounding whitespace.
    pub fn text(&self) -> String {
        self.segments.concat().trim().to_string()
    }
}

/// Speech-to-text transcriber.
///
/// Implementations are shared across concurrent requests.
pub trait Transcriber: Send + Sync {
    /// Transcribe 16kHz mono samples.
    fn transcribe(&self, audio: &[f32], options: &TranscribeOptions) -> Result<Transcript>;
}

/// Inference task understood by Whisper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Transcribe,
    /// Transcribe into English.
    Translate,
}

impl FromStr for Task {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transcribe" => Ok(Task::Transcribe),
            "translate" => Ok(Task::Translate),
            other => anyhow::bail!("{:?} is not a valid task", other),
        }
    }
}

/// Compute device parsed from the configured device string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu { index: i32 },
}

impl Device {
    pub fn use_gpu(&self) -> bool {
        matches!(self, Device::Gpu { .. })
    }

    /// Whether this binary was built with a GPU backend.
    pub fn gpu_backend_available() -> bool {
        cfg!(any(feature = "cuda", feature = "metal", feature = "coreml"))
    }
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let (kind, index) = match normalized.split_once(':') {
            Some((kind, index)) => {
                let index = index
                    .parse::<i32>()
                    .map_err(|_| anyhow::anyhow!("Invalid device index in {:?}", s))?;
                (kind, Some(index))
            }
            None => (normalized.as_str(), None),
        };

        match (kind, index) {
            ("cpu", None) => Ok(Device::Cpu),
            ("cuda" | "gpu", index) => Ok(Device::Gpu {
                index: index.unwrap_or(0),
            }),
            ("metal" | "auto", None) => Ok(Device::Gpu { index: 0 }),
            _ => anyhow::bail!("Unsupported device {:?}", s),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu { index } => write!(f, "gpu:{}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_text_concatenates_and_trims() {
        let transcript = Transcript {
            segments: vec![" Hello".to_string(), " world.".to_string(), " ".to_string()],
            language: "en".to_string(),
        };
        assert_eq!(transcript.text(), "Hello world.");
    }

    #[test]
    fn test_transcript_text_no_separator() {
        // Segments carry their own spacing; nothing is inserted between them.
        let transcript = Transcript {
            segments: vec!["foo".to_string(), "bar".to_string()],
            language: "en".to_string(),
        };
        assert_eq!(transcript.text(), "foobar");
    }

    #[test]
    fn test_task_parse() {
        assert_eq!("transcribe".parse::<Task>().unwrap(), Task::Transcribe);
        assert_eq!("translate".parse::<Task>().unwrap(), Task::Translate);
        let err = "summarize".parse::<Task>().unwrap_err();
        assert!(err.to_string().contains("summarize"));
    }

    #[test]
    fn test_default_options() {
        let options = TranscribeOptions::default();
        assert_eq!(options.language, None);
        assert_eq!(options.task, "transcribe");
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Gpu { index: 0 });
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Gpu { index: 1 });
        assert_eq!("gpu:2".parse::<Device>().unwrap(), Device::Gpu { index: 2 });
        assert_eq!("metal".parse::<Device>().unwrap(), Device::Gpu { index: 0 });
        assert_eq!("auto".parse::<Device>().unwrap(), Device::Gpu { index: 0 });
    }

    #[test]
    fn test_device_parse_rejects_unknown() {
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
        assert!("cpu:0".parse::<Device>().is_err());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Gpu { index: 1 }.to_string(), "gpu:1");
    }
}
