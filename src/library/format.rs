//! Extension-based classification of audio files.
//!
//! `Native` files are handed to the output backend as paths; `Transcode`
//! files go through the external decoder first.

use std::path::Path;

/// Extensions the output backend decodes directly.
pub const NATIVE_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "oga"];

/// Extensions that need the external transcoder.
pub const TRANSCODE_EXTENSIONS: &[&str] = &[
    "m4a", "aac", "mp4", "alac", "opus", "wma", "aiff", "aif", "ape", "wv", "mka", "webm", "ac3",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    Native,
    Transcode,
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Classify `path` by extension.
///
/// Unknown (or missing) extensions are treated as `Native`: the backend gets
/// a chance to open them and a failure surfaces as a decode error at load time.
pub fn classify(path: &Path) -> Format {
    match extension_lower(path) {
        Some(ext) if TRANSCODE_EXTENSIONS.contains(&ext.as_str()) => Format::Transcode,
        _ => Format::Native,
    }
}

/// Every extension the player knows how to play, in either mode.
pub fn default_extensions() -> Vec<String> {
    NATIVE_EXTENSIONS
        .iter()
        .chain(TRANSCODE_EXTENSIONS)
        .map(|e| e.to_string())
        .collect()
}

/// Whether `path` carries one of `extensions` (case-insensitive, leading dots ignored).
pub fn is_audio_path(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = extension_lower(path) else {
        return false;
    };
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .any(|e| !e.is_empty() && e == ext)
}
