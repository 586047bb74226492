//! XDG directory utilities for voice-transcribe.

use std::path::PathBuf;

use anyhow::{Context, Result};
use xdg::BaseDirectories;

const APP_NAME: &str = "voice-transcribe";

fn base_dirs() -> BaseDirectories {
    BaseDirectories::with_prefix(APP_NAME)
}

/// Return the XDG config directory (no creation - config may not exist yet).
/// `~/.config/voice-transcribe/`
pub fn config_dir() -> Result<PathBuf> {
    base_dirs()
        .get_config_home()
        .context("Could not determine config directory (HOME not set?)")
}

/// Default config file path.
/// `~/.config/voice-transcribe/config.toml`
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Return the XDG data directory (no creation).
/// `~/.local/share/voice-transcribe/`
pub fn data_dir() -> Result<PathBuf> {
    base_dirs()
        .get_data_home()
        .context("Could not determine data directory (HOME not set?)")
}

/// Directory where downloaded model files live.
/// `~/.local/share/voice-transcribe/models/`
pub fn models_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("models"))
}
