//! Shared pieces of voice-transcribe used by both the server and the CLI.

pub mod api;
pub mod client;
pub mod dirs;
