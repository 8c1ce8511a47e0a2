use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the playback engine.
///
/// Only `BackendUnavailable` is fatal. Everything tied to a single track is
/// turned into a notice plus an advance to the next entry by the controller.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("could not decode {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    BackendUnavailable(String),

    #[error("radio unavailable: {0}")]
    RadioUnavailable(String),

    #[error("`{tool}` was not found on PATH")]
    ExternalToolMissing { tool: String },

    #[error("metadata error for {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("playlist error: {0}")]
    Playlist(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PlayerError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DecodeFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that only concern the current track; the playlist moves on.
    pub fn is_per_track(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailed { .. } | Self::ExternalToolMissing { .. }
        )
    }
}
