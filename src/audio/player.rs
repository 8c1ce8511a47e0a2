use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Settings;
use crate::library::Track;

use super::backend::OutputBackend;
use super::clock::MonotonicClock;
use super::controller::EngineConfig;
use super::error::PlayerError;
use super::radio::RadioEngine;
use super::sink::RodioBackend;
use super::thread::{BackendFactory, EngineParts, spawn_audio_thread};
use super::transcode::FfmpegTranscoder;
use super::types::{AudioCmd, PlayerHandle};

/// Owns the audio thread. Commands go in over a channel; state comes back
/// through the shared `PlayerHandle`.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    handle: PlayerHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Start the engine on the default output device.
    ///
    /// Fails with `BackendUnavailable` when no output can be opened.
    pub fn new(tracks: Vec<Track>, settings: &Settings) -> Result<Self, PlayerError> {
        let config = EngineConfig::from_settings(settings);
        let parts = EngineParts {
            transcoder: Arc::new(FfmpegTranscoder::new(
                settings.tools.transcoder.as_str(),
                config.format,
            )),
            radio: RadioEngine::new(
                settings.tools.stream_decoder.as_str(),
                config.format,
                Duration::from_millis(settings.audio.stream_chunk_ms),
                settings.audio.stream_queue_chunks,
            ),
            clock: Arc::new(MonotonicClock::new()),
            tracks,
            config,
        };
        let make_backend: BackendFactory = Box::new(|| {
            RodioBackend::open_default().map(|b| Box::new(b) as Box<dyn OutputBackend>)
        });
        Self::spawn(make_backend, parts)
    }

    pub(super) fn spawn(make_backend: BackendFactory, parts: EngineParts) -> Result<Self, PlayerError> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let join = spawn_audio_thread(make_backend, parts, rx, ready_tx)?;
        match ready_rx.recv() {
            Ok(Ok(handle)) => Ok(Self {
                tx,
                handle,
                join: Mutex::new(Some(join)),
            }),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(PlayerError::BackendUnavailable(
                    "audio thread exited during startup".into(),
                ))
            }
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(cmd)
    }

    /// Stop playback and wait for the audio thread to finish.
    pub fn quit(&self) {
        let _ = self.send(AudioCmd::Quit);

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.quit();
    }
}
