//! Audio-related small types and handles.
//!
//! This module defines common enums and type aliases used by the
//! audio subsystem (looping mode, commands, playback info and handles).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::LoopModeSetting;
use crate::library::Track;

use super::tracker::PositionTracker;
use super::visualizer::VisualizerFeed;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LoopMode {
    /// Do not wrap at the end of the current queue.
    NoLoop,
    /// Wrap around to the start of the current queue.
    #[default]
    LoopAll,
    /// Repeat the current song when it ends.
    LoopOne,
}

impl LoopMode {
    /// Off -> all -> one -> off.
    pub fn cycle(self) -> Self {
        match self {
            Self::NoLoop => Self::LoopAll,
            Self::LoopAll => Self::LoopOne,
            Self::LoopOne => Self::NoLoop,
        }
    }
}

impl From<LoopModeSetting> for LoopMode {
    fn from(s: LoopModeSetting) -> Self {
        match s {
            LoopModeSetting::NoLoop => Self::NoLoop,
            LoopModeSetting::LoopAll => Self::LoopAll,
            LoopModeSetting::LoopOne => Self::LoopOne,
        }
    }
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Start playing the track at the given index.
    Play(usize),
    /// Stop playback immediately.
    Stop,
    /// Toggle pause/resume (starts the current track when stopped).
    TogglePause,
    /// Toggle shuffle mode in the audio thread.
    ToggleShuffle,
    /// Set the current queue/order to the provided indices.
    SetQueue(Vec<usize>),
    /// Set the loop mode used by the player.
    SetLoopMode(LoopMode),
    /// Skip to the next track.
    Next,
    /// Go to the previous track.
    Prev,
    /// Seek to an absolute offset in the current track.
    Seek(Duration),
    /// Seek by the specified number of seconds (positive or negative).
    SeekBy(i64),
    SetVolume(f32),
    /// Tune into an internet radio stream.
    PlayRadio(String),
    /// Replace the playlist with a single file and play it.
    OpenFile(PathBuf),
    /// Replace the playlist with the audio files under a folder.
    LoadFolder(PathBuf),
    ImportPlaylist(PathBuf),
    ExportPlaylist(PathBuf),
    /// Embed the cover image found in a track's folder into its tags.
    EmbedFolderCover(usize),
    /// Quit the audio thread.
    Quit,
}

#[derive(Debug, Clone)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    /// Currently playing track index in the playlist (if any).
    pub index: Option<usize>,
    pub state: PlaybackState,
    /// Length of the current track, when known.
    pub duration: Option<Duration>,
    /// A radio stream is active. There is no position, duration or seek.
    pub is_radio: bool,
    pub radio_url: Option<String>,
    /// A transcode for the current track is in flight.
    pub loading: bool,
    pub volume: f32,
    pub shuffle: bool,
    pub loop_mode: LoopMode,
    /// Cover picture of the current track.
    pub cover_art: Option<Arc<Vec<u8>>>,
    /// Last user-facing message (errors, disconnects).
    pub notice: Option<String>,
    /// Bumped whenever the playlist contents are replaced.
    pub library_rev: u64,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            index: None,
            state: PlaybackState::Stopped,
            duration: None,
            is_radio: false,
            radio_url: None,
            loading: false,
            volume: 1.0,
            shuffle: false,
            loop_mode: LoopMode::default(),
            cover_art: None,
            notice: None,
            library_rev: 0,
        }
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
pub type OrderHandle = Arc<Mutex<Vec<usize>>>;
pub type TracksHandle = Arc<Mutex<Arc<Vec<Track>>>>;

/// Read-only view of the engine for the polling path.
///
/// Nothing here decodes or blocks on the audio thread.
#[derive(Clone)]
pub struct PlayerHandle {
    pub(super) info: PlaybackHandle,
    pub(super) order: OrderHandle,
    pub(super) tracks: TracksHandle,
    pub(super) tracker: Arc<PositionTracker>,
    pub(super) feed: Arc<VisualizerFeed>,
}

impl PlayerHandle {
    pub fn snapshot(&self) -> PlaybackInfo {
        self.info.lock().map(|i| i.clone()).unwrap_or_default()
    }

    /// Current position, or `None` while a radio stream is active.
    pub fn position(&self) -> Option<Duration> {
        let radio = self.info.lock().map(|i| i.is_radio).unwrap_or(false);
        (!radio).then(|| self.tracker.position())
    }

    /// Sample magnitudes at the current position. Empty for radio.
    pub fn viz_frame(&self) -> Vec<f32> {
        match self.position() {
            Some(pos) => self.feed.get_viz_frame(pos),
            None => Vec::new(),
        }
    }

    pub fn tracks(&self) -> Arc<Vec<Track>> {
        self.tracks
            .lock()
            .map(|t| Arc::clone(&t))
            .unwrap_or_default()
    }

    /// Current shuffle order (identity when shuffle is off).
    pub fn order(&self) -> Vec<usize> {
        self.order.lock().map(|o| o.clone()).unwrap_or_default()
    }
}
