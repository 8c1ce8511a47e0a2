//! Playback engine: output backend, transcode bridge, position tracking,
//! visualizer feed, radio streaming and the controller that ties them
//! together on a dedicated audio thread.

mod backend;
mod clock;
mod controller;
mod error;
mod pcm;
mod player;
mod playlist;
mod radio;
mod sink;
mod stream;
mod thread;
mod tracker;
mod transcode;
mod types;
mod visualizer;

pub use error::PlayerError;
pub use player::AudioPlayer;
pub use types::{AudioCmd, LoopMode, PlaybackInfo, PlaybackState, PlayerHandle};
