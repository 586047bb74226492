//! Request payload handling: base64 decoding and the per-request audio file.

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::audio::looks_like_wav;

/// Why a payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("audio_base64 is required")]
    Missing,
    #[error("Invalid base64 audio")]
    InvalidBase64,
}

/// Decode the `audio_base64` field.
///
/// Everything up to and including the first comma is discarded, so
/// `data:audio/wav;base64,<data>` and `<data>` decode the same. ASCII
/// whitespace inside the payload is ignored.
pub fn decode_audio(payload: &str) -> Result<Vec<u8>, PayloadError> {
    if payload.is_empty() {
        return Err(PayloadError::Missing);
    }

    let data = match payload.split_once(',') {
        Some((_header, data)) => data,
        None => payload,
    };

    let compact: Vec<u8> = data
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(&compact)
        .map_err(|_| PayloadError::InvalidBase64)
}

/// Uniquely named audio file owned by one request.
///
/// The file is removed when the value is dropped, on every exit path.
pub struct TempAudioFile {
    file: NamedTempFile,
}

impl TempAudioFile {
    /// Write `bytes` to a fresh `.wav` file in `dir` (system temp dir if `None`).
    ///
    /// The suffix is always `.wav`, whatever the bytes actually are; a
    /// warning is logged when they lack a RIFF/WAVE header.
    pub fn write(bytes: &[u8], dir: Option<&Path>) -> Result<Self> {
        if !looks_like_wav(bytes) {
            warn!(
                bytes = bytes.len(),
                "Audio payload has no RIFF/WAVE header but is stored as .wav"
            );
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("vt-audio-").suffix(".wav");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("Failed to create temporary audio file")?;

        file.write_all(bytes)
            .context("Failed to write temporary audio file")?;
        file.flush()
            .context("Failed to flush temporary audio file")?;

        debug!(path = %file.path().display(), bytes = bytes.len(), "Wrote temporary audio file");

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "Removing temporary audio file");
    }
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
