use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::library::default_extensions;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/cadenza/config.toml` or `~/.config/cadenza/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `CADENZA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub tools: ToolSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Initial output volume, 0.0 to 1.0.
    pub volume: f32,
    /// Width of one visualizer window (milliseconds).
    pub viz_window_ms: u64,
    /// How much of each track is decoded for the visualizer (seconds).
    pub preview_cap_secs: u64,
    /// Sample rate requested from the external decoders.
    pub sample_rate: u32,
    /// Channel count requested from the external decoders.
    pub channels: u16,
    /// Size of one PCM chunk pushed by the radio feeder (milliseconds).
    pub stream_chunk_ms: u64,
    /// Number of chunks the radio feeder may run ahead of the output.
    pub stream_queue_chunks: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 0.7,
            viz_window_ms: 80,
            preview_cap_secs: 300,
            sample_rate: 44_100,
            channels: 2,
            stream_chunk_ms: 50,
            stream_queue_chunks: 16,
        }
    }
}

/// External executables. Both are invoked with an argument list, never a shell.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub transcoder: String,
    pub stream_decoder: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            transcoder: "ffmpeg".to_string(),
            stream_decoder: "ffmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Whether the cursor starts in "follow playback" mode.
    pub follow_playback: bool,
    /// Fixed polling cadence of the front end (milliseconds).
    pub poll_ms: u64,
    /// Number of amplitude bars in the meter.
    pub meter_bars: usize,
    /// How long a peak marker holds before falling (milliseconds).
    pub peak_hold_ms: u64,
    /// Which time fields to show for the status line, and in what order.
    ///
    /// Example: ["elapsed", "total", "remaining"]
    pub now_playing_time_fields: Vec<TimeField>,
    /// Separator used to join `now_playing_time_fields`.
    pub now_playing_time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            follow_playback: true,
            poll_ms: 50,
            meter_bars: 32,
            peak_hold_ms: 600,
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining],
            now_playing_time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
    /// Volume change per `+` / `-` press.
    pub volume_step: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            scrub_seconds: 5,
            volume_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Default loop mode.
    pub loop_mode: LoopModeSetting,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            loop_mode: LoopModeSetting::LoopAll,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopModeSetting {
    #[serde(alias = "no_loop", alias = "no-loop", alias = "off")]
    NoLoop,
    #[serde(
        alias = "loopall",
        alias = "loop_all",
        alias = "loop-all",
        alias = "repeat-all"
    )]
    LoopAll,
    #[serde(
        alias = "loopone",
        alias = "loop_one",
        alias = "loop-one",
        alias = "repeat-one"
    )]
    LoopOne,
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    /// "artist - title".
    Display,
    Title,
    Artist,
    Album,
    Year,
    Filename,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,

    /// Which fields to use to build `Track.display` and its ordering.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            display_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            display_separator: " - ".to_string(),
        }
    }
}

/// Small keyed record remembered between runs. Where it is stored is the
/// config layer's business; the player only reads and updates the fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    last_folder: Option<PathBuf>,
    radio_favourites: Vec<String>,
}

impl SessionSettings {
    pub fn last_folder(&self) -> Option<&Path> {
        self.last_folder.as_deref()
    }

    pub fn set_last_folder(&mut self, dir: impl Into<PathBuf>) {
        self.last_folder = Some(dir.into());
    }

    pub fn radio_favourites(&self) -> &[String] {
        &self.radio_favourites
    }

    /// Add `url` unless it is already a favourite. Returns whether it was added.
    pub fn add_radio_favourite(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if url.trim().is_empty() || self.radio_favourites.contains(&url) {
            return false;
        }
        self.radio_favourites.push(url);
        true
    }

    pub fn remove_radio_favourite(&mut self, url: &str) -> bool {
        let before = self.radio_favourites.len();
        self.radio_favourites.retain(|u| u != url);
        before != self.radio_favourites.len()
    }
}
