//! Track model, folder scanning, tag access and playlist files.

mod display;
mod format;
pub mod m3u;
mod model;
mod scan;
pub mod tags;

pub use format::{Format, classify, default_extensions, is_audio_path};
pub use model::{Track, TrackKey};
pub use scan::{read_track, scan};
