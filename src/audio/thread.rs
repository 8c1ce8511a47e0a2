use std::io;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::library::Track;

use super::backend::OutputBackend;
use super::clock::Clock;
use super::controller::{Controller, EngineConfig};
use super::error::PlayerError;
use super::radio::RadioEngine;
use super::transcode::Transcoder;
use super::types::{AudioCmd, PlayerHandle};

/// How often the controller drains worker results and checks for track end.
const TICK: Duration = Duration::from_millis(20);

/// Builds the output backend on the audio thread. The rodio stream must be
/// created (and dropped) on the thread that uses it.
pub(super) type BackendFactory =
    Box<dyn FnOnce() -> Result<Box<dyn OutputBackend>, PlayerError> + Send>;

/// Everything the controller needs besides the backend.
pub(super) struct EngineParts {
    pub transcoder: Arc<dyn Transcoder>,
    pub radio: RadioEngine,
    pub clock: Arc<dyn Clock>,
    pub tracks: Vec<Track>,
    pub config: EngineConfig,
}

pub(super) fn spawn_audio_thread(
    make_backend: BackendFactory,
    parts: EngineParts,
    rx: Receiver<AudioCmd>,
    ready: SyncSender<Result<PlayerHandle, PlayerError>>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("audio".into()).spawn(move || {
        let backend = match make_backend() {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "audio output init failed");
                let _ = ready.send(Err(e));
                return;
            }
        };
        let mut controller = Controller::new(
            backend,
            parts.transcoder,
            parts.radio,
            parts.clock,
            parts.tracks,
            parts.config,
        );
        if ready.send(Ok(controller.handle())).is_err() {
            return;
        }
        tracing::debug!("audio thread running");

        loop {
            match rx.recv_timeout(TICK) {
                Ok(AudioCmd::Quit) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(cmd) => dispatch(&mut controller, cmd),
                Err(RecvTimeoutError::Timeout) => {}
            }
            controller.tick();
        }

        controller.stop();
        tracing::debug!("audio thread stopped");
    })
}

fn dispatch(c: &mut Controller, cmd: AudioCmd) {
    tracing::trace!(?cmd, "audio command");
    // Failures below are already published as a notice.
    match cmd {
        AudioCmd::Play(i) => c.load_track(i),
        AudioCmd::Stop => c.stop(),
        AudioCmd::TogglePause => c.toggle_pause(),
        AudioCmd::ToggleShuffle => c.toggle_shuffle(),
        AudioCmd::SetQueue(q) => c.set_queue(q),
        AudioCmd::SetLoopMode(m) => c.set_loop_mode(m),
        AudioCmd::Next => c.next(),
        AudioCmd::Prev => c.prev(),
        AudioCmd::Seek(offset) => c.seek(offset),
        AudioCmd::SeekBy(secs) => c.seek_by(secs),
        AudioCmd::SetVolume(v) => c.set_volume(v),
        AudioCmd::PlayRadio(url) => {
            let _ = c.play_radio(&url);
        }
        AudioCmd::OpenFile(path) => c.open_file(&path),
        AudioCmd::LoadFolder(dir) => {
            c.load_folder(&dir);
        }
        AudioCmd::ImportPlaylist(path) => {
            let _ = c.import_playlist(&path);
        }
        AudioCmd::ExportPlaylist(path) => {
            let _ = c.export_playlist(&path);
        }
        AudioCmd::EmbedFolderCover(index) => {
            let _ = c.embed_folder_cover(index);
        }
        AudioCmd::Quit => {}
    }
}
