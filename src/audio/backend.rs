//! The seam between the controller and whatever actually makes sound.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::error::PlayerError;
use super::pcm::PcmBuffer;
use super::stream::PcmStream;

pub enum BackendSource {
    /// A natively decodable file, read from disk by the backend.
    File(PathBuf),
    /// Audio already decoded by the transcode bridge.
    Buffer(Arc<PcmBuffer>),
    /// Live PCM pushed by the radio feeder.
    Stream(PcmStream),
}

impl std::fmt::Debug for BackendSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(p) => f.debug_tuple("File").field(p).finish(),
            Self::Buffer(b) => f.debug_tuple("Buffer").field(&b.byte_len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Playback primitives over the platform mixer.
///
/// Deliberately has no position query: the backend's clock restarts on every
/// `load`, so callers use the position tracker instead.
pub trait OutputBackend {
    /// Replace the current source. The new source starts paused.
    fn load(&mut self, source: BackendSource) -> Result<(), PlayerError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// Clamped to `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
    /// Restart the loaded source at `offset`, keeping play/pause state.
    fn seek_to(&mut self, offset: Duration) -> Result<(), PlayerError>;
    /// True once the loaded source has played out (or nothing is loaded).
    fn is_drained(&self) -> bool;
}
