//! Playback controller: owns the playlist and the single live session and
//! routes every transport command.
//!
//! Decoding never happens on the controller's thread. Transcodes and
//! visualizer preloads run on short-lived workers and come back through a
//! channel drained by `tick()`. Every result carries the epoch it was started
//! under; anything started before the latest load, seek, stop or radio switch
//! is dropped and counted.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::{LibrarySettings, Settings};
use crate::library::tags::{self, CoverArtSource, EmbeddedArt};
use crate::library::{self, Format, Track, TrackKey, m3u};

use super::backend::{BackendSource, OutputBackend};
use super::clock::Clock;
use super::error::PlayerError;
use super::pcm::{PcmBuffer, PcmFormat};
use super::playlist::Playlist;
use super::radio::{RadioEngine, RadioEvent, RadioSession};
use super::tracker::PositionTracker;
use super::transcode::{DecodeRequest, Transcoder};
use super::types::{
    LoopMode, OrderHandle, PlaybackHandle, PlaybackInfo, PlaybackState, PlayerHandle, TracksHandle,
};
use super::visualizer::VisualizerFeed;

/// Engine knobs derived from the user settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub format: PcmFormat,
    pub preview_cap: Duration,
    pub viz_window: Duration,
    pub volume: f32,
    pub shuffle: bool,
    pub loop_mode: LoopMode,
    pub library: LibrarySettings,
}

impl EngineConfig {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            format: PcmFormat {
                sample_rate: s.audio.sample_rate,
                channels: s.audio.channels,
            },
            preview_cap: Duration::from_secs(s.audio.preview_cap_secs),
            viz_window: Duration::from_millis(s.audio.viz_window_ms),
            volume: s.audio.volume,
            shuffle: s.playback.shuffle,
            loop_mode: s.playback.loop_mode.into(),
            library: s.library.clone(),
        }
    }
}

enum JobResult {
    /// Full decode of a transcoded track, starting at `offset`.
    Decoded {
        epoch: u64,
        index: usize,
        offset: Duration,
        result: Result<PcmBuffer, PlayerError>,
    },
    /// Capped visualizer preload.
    Preview {
        key: TrackKey,
        result: Result<PcmBuffer, PlayerError>,
    },
}

/// A transcode in flight for the current track.
#[derive(Debug, Clone, Copy)]
struct Pending {
    epoch: u64,
    offset: Duration,
    /// Start playing once the buffer is loaded.
    resume: bool,
}

struct TrackSession {
    index: usize,
    key: TrackKey,
    format: Format,
    duration: Option<Duration>,
    /// Offset the backend's current source starts at.
    load_offset: Duration,
    cover: Option<Arc<Vec<u8>>>,
}

pub struct Controller {
    backend: Box<dyn OutputBackend>,
    transcoder: Arc<dyn Transcoder>,
    radio_engine: RadioEngine,
    radio: Option<RadioSession>,
    tracker: Arc<PositionTracker>,
    feed: Arc<VisualizerFeed>,
    playlist: Playlist,
    library: LibrarySettings,
    art: Arc<dyn CoverArtSource>,

    session: Option<TrackSession>,
    pending: Option<Pending>,
    /// Track whose visualizer preload is currently decoding.
    preview_in_flight: Option<TrackKey>,
    epoch: u64,
    failures: usize,
    discarded: usize,
    volume: f32,

    jobs_tx: Sender<JobResult>,
    jobs_rx: Receiver<JobResult>,
    radio_tx: Sender<RadioEvent>,
    radio_rx: Receiver<RadioEvent>,

    info: PlaybackHandle,
    order: OrderHandle,
    tracks: TracksHandle,
}

impl Controller {
    pub fn new(
        backend: Box<dyn OutputBackend>,
        transcoder: Arc<dyn Transcoder>,
        radio_engine: RadioEngine,
        clock: Arc<dyn Clock>,
        tracks: Vec<Track>,
        config: EngineConfig,
    ) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (radio_tx, radio_rx) = mpsc::channel();

        let mut playlist = Playlist::new(tracks);
        playlist.set_loop_mode(config.loop_mode);
        if config.shuffle {
            playlist.set_shuffle(true);
        }

        let mut c = Self {
            backend,
            transcoder,
            radio_engine,
            radio: None,
            tracker: Arc::new(PositionTracker::new(clock)),
            feed: Arc::new(VisualizerFeed::new(config.preview_cap, config.viz_window)),
            order: Arc::new(Mutex::new(playlist.order().to_vec())),
            tracks: Arc::new(Mutex::new(playlist.tracks())),
            playlist,
            library: config.library,
            art: Arc::new(EmbeddedArt),
            session: None,
            pending: None,
            preview_in_flight: None,
            epoch: 0,
            failures: 0,
            discarded: 0,
            volume: config.volume,
            jobs_tx,
            jobs_rx,
            radio_tx,
            radio_rx,
            info: Arc::new(Mutex::new(PlaybackInfo::default())),
        };
        c.set_volume(config.volume);
        c.publish();
        c
    }

    /// Replace where the now-playing cover comes from.
    pub fn with_cover_art(mut self, art: Arc<dyn CoverArtSource>) -> Self {
        self.art = art;
        self
    }

    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            info: Arc::clone(&self.info),
            order: Arc::clone(&self.order),
            tracks: Arc::clone(&self.tracks),
            tracker: Arc::clone(&self.tracker),
            feed: Arc::clone(&self.feed),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.tracker.state()
    }

    /// Position of the current track; `None` while on radio.
    pub fn position(&self) -> Option<Duration> {
        self.radio.is_none().then(|| self.tracker.position())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.session.as_ref().and_then(|s| s.duration)
    }

    /// Offset the backend's current source was loaded or seeked at.
    pub fn load_offset(&self) -> Option<Duration> {
        self.session.as_ref().map(|s| s.load_offset)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.index)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_radio(&self) -> bool {
        self.radio.is_some()
    }

    /// Worker results dropped because a newer command superseded them.
    pub fn discarded_decodes(&self) -> usize {
        self.discarded
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn feed(&self) -> &VisualizerFeed {
        &self.feed
    }

    #[cfg(test)]
    pub(crate) fn radio_session(&self) -> Option<&RadioSession> {
        self.radio.as_ref()
    }

    // ---- transport ----------------------------------------------------

    /// Load and start playing `index` from the beginning.
    pub fn load_track(&mut self, index: usize) {
        self.failures = 0;
        self.start_track(index);
    }

    fn start_track(&mut self, index: usize) {
        let mut next = Some(index);
        while let Some(i) = next {
            next = match self.try_start(i) {
                Ok(()) => None,
                Err(e) => self.track_failed(i, e),
            };
        }
        self.publish();
    }

    fn try_start(&mut self, index: usize) -> Result<(), PlayerError> {
        let Some(track) = self.playlist.get(index).cloned() else {
            return Ok(());
        };
        self.teardown_radio();
        self.epoch += 1;
        self.pending = None;
        self.backend.stop();
        self.tracker.reset();
        self.playlist.set_current(index);

        let key = track.key();
        if !self.feed.has_snapshot(&key) {
            self.feed.clear();
        }
        self.session = Some(TrackSession {
            index,
            key: key.clone(),
            format: track.format,
            duration: track.duration,
            load_offset: Duration::ZERO,
            cover: self.art.cover_art(&track).map(Arc::new),
        });
        tracing::info!(index, path = %track.path.display(), format = ?track.format, "loading track");

        match track.format {
            Format::Native => {
                self.backend.load(BackendSource::File(track.path.clone()))?;
                self.backend.play();
                self.tracker.start(Duration::ZERO);
                self.failures = 0;
                self.schedule_preview(&track, key);
            }
            Format::Transcode => {
                self.pending = Some(Pending {
                    epoch: self.epoch,
                    offset: Duration::ZERO,
                    resume: true,
                });
                self.spawn_decode(DecodeRequest::whole(&track.path), index);
            }
        }
        Ok(())
    }

    /// Turn a per-track failure into a notice and pick what to try next.
    /// Anything else stops playback.
    fn track_failed(&mut self, index: usize, err: PlayerError) -> Option<usize> {
        tracing::warn!(index, error = %err, "track failed");
        self.notify(err.to_string());
        if !err.is_per_track() {
            self.stop();
            return None;
        }
        self.failures += 1;
        if self.failures >= self.playlist.queue().len().max(1) {
            tracing::warn!(failures = self.failures, "every track failed, stopping");
            self.stop();
            self.notify(format!("{err} (no playable tracks left)"));
            return None;
        }
        let next = self.playlist.after_failure();
        if next.is_none() {
            self.stop();
        }
        next
    }

    pub fn play(&mut self) {
        match self.state() {
            PlaybackState::Playing => {}
            PlaybackState::Paused => self.resume(),
            PlaybackState::Stopped => {
                if self.pending.is_some() {
                    return;
                }
                if self.playlist.is_empty() {
                    return;
                }
                let target = self
                    .playlist
                    .current()
                    .or_else(|| self.playlist.queue().first().copied());
                if let Some(i) = target {
                    self.load_track(i);
                }
            }
        }
    }

    pub fn pause(&mut self) {
        if let Some(p) = self.pending.as_mut() {
            p.resume = false;
        }
        if self.state() == PlaybackState::Playing {
            self.backend.pause();
            self.tracker.pause();
        }
        self.publish();
    }

    pub fn resume(&mut self) {
        if let Some(p) = self.pending.as_mut() {
            p.resume = true;
            // The position stays held until the buffer arrives.
            self.tracker.resume();
            self.publish();
            return;
        }
        if self.state() == PlaybackState::Paused {
            self.backend.resume();
            self.tracker.resume();
        }
        self.publish();
    }

    pub fn toggle_pause(&mut self) {
        let loading_resumes = self.pending.map(|p| p.resume);
        match (self.state(), loading_resumes) {
            (_, Some(true)) => self.pause(),
            (_, Some(false)) => self.resume(),
            (PlaybackState::Playing, None) => self.pause(),
            (PlaybackState::Paused, None) => self.resume(),
            (PlaybackState::Stopped, None) => self.play(),
        }
    }

    pub fn stop(&mut self) {
        self.teardown_radio();
        self.epoch += 1;
        self.pending = None;
        self.backend.stop();
        self.tracker.reset();
        self.session = None;
        self.publish();
    }

    /// Seek within the current track. Out-of-range targets are clamped.
    ///
    /// A transcoded track is re-decoded from `offset` and reloaded once the
    /// buffer is ready; the position is held at `offset` meanwhile. Seeking
    /// a transcoded track to its end finishes it without decoding.
    pub fn seek(&mut self, offset: Duration) {
        if self.radio.is_some() {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let offset = match session.duration {
            Some(d) => offset.min(d),
            None => offset,
        };
        let (index, format, duration) = (session.index, session.format, session.duration);
        self.epoch += 1;

        match format {
            Format::Native => {
                match self.backend.seek_to(offset) {
                    Ok(()) => {
                        self.tracker.rebase(offset);
                        if let Some(s) = self.session.as_mut() {
                            s.load_offset = offset;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "seek failed");
                        self.notify(e.to_string());
                    }
                }
            }
            Format::Transcode if duration.is_some_and(|d| offset >= d) => {
                tracing::debug!(index, ?offset, "transcode seek to end");
                self.finish_track();
            }
            Format::Transcode => {
                let resume = match self.pending {
                    Some(p) => p.resume,
                    None => self.state() == PlaybackState::Playing,
                };
                tracing::debug!(index, ?offset, "transcode seek");
                self.backend.pause();
                self.tracker.hold(offset);
                self.pending = Some(Pending {
                    epoch: self.epoch,
                    offset,
                    resume,
                });
                if let Some(track) = self.playlist.get(index) {
                    let req = DecodeRequest::from_offset(&track.path, offset);
                    self.spawn_decode(req, index);
                }
            }
        }
        self.publish();
    }

    /// Scrub relative to the current position.
    pub fn seek_by(&mut self, delta_secs: i64) {
        if self.session.is_none() || self.radio.is_some() {
            return;
        }
        let cur = self.tracker.position();
        let delta = Duration::from_secs(delta_secs.unsigned_abs());
        let target = if delta_secs >= 0 {
            cur + delta
        } else {
            cur.saturating_sub(delta)
        };
        self.seek(target);
    }

    pub fn next(&mut self) {
        if let Some(i) = self.playlist.manual_next() {
            self.load_track(i);
        }
    }

    pub fn prev(&mut self) {
        if let Some(i) = self.playlist.manual_prev() {
            self.load_track(i);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.backend.set_volume(self.volume);
        self.publish();
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.playlist.set_loop_mode(mode);
        self.publish();
    }

    pub fn toggle_shuffle(&mut self) {
        self.playlist.toggle_shuffle();
        self.publish();
    }

    pub fn set_queue(&mut self, queue: Vec<usize>) {
        self.playlist.set_queue(queue);
        self.publish();
    }

    // ---- radio --------------------------------------------------------

    /// Stop whatever is playing and tune into `url`.
    pub fn play_radio(&mut self, url: &str) -> Result<(), PlayerError> {
        self.stop();
        self.feed.clear();
        self.playlist.clear_current();

        let result = self.connect_radio(url);
        if let Err(e) = &result {
            tracing::warn!(url, error = %e, "radio failed");
            self.notify(e.to_string());
        }
        self.publish();
        result
    }

    fn connect_radio(&mut self, url: &str) -> Result<(), PlayerError> {
        let (session, stream) = self.radio_engine.connect(url, self.radio_tx.clone())?;
        self.backend.load(BackendSource::Stream(stream))?;
        self.backend.play();
        self.tracker.start(Duration::ZERO);
        self.radio = Some(session);
        Ok(())
    }

    fn teardown_radio(&mut self) {
        if let Some(mut r) = self.radio.take() {
            r.disconnect();
        }
    }

    // ---- library ------------------------------------------------------

    /// Replace the playlist with a single file and play it.
    pub fn open_file(&mut self, path: &Path) {
        let track = library::read_track(path, &self.library);
        self.replace_tracks(vec![track]);
        self.load_track(0);
    }

    /// Replace the playlist with the audio files under `dir`. Returns how
    /// many tracks were found.
    pub fn load_folder(&mut self, dir: &Path) -> usize {
        let tracks = library::scan(dir, &self.library);
        let n = tracks.len();
        if n == 0 {
            self.notify(format!("no audio files in {}", dir.display()));
        }
        self.replace_tracks(tracks);
        n
    }

    /// Replace the playlist with the entries of an M3U file.
    pub fn import_playlist(&mut self, path: &Path) -> Result<usize, PlayerError> {
        let paths = m3u::read(path).inspect_err(|e| self.notify(e.to_string()))?;
        let tracks: Vec<Track> = paths
            .iter()
            .map(|p| library::read_track(p, &self.library))
            .collect();
        let n = tracks.len();
        self.replace_tracks(tracks);
        Ok(n)
    }

    /// Write the playlist, in playlist order, as M3U.
    pub fn export_playlist(&mut self, path: &Path) -> Result<(), PlayerError> {
        let paths: Vec<PathBuf> = self.playlist.tracks().iter().map(|t| t.path.clone()).collect();
        let result = m3u::write(path, &paths);
        match &result {
            Ok(()) => self.notify(format!("saved {} tracks to {}", paths.len(), path.display())),
            Err(e) => self.notify(e.to_string()),
        }
        result
    }

    /// Embed the cover image sitting next to track `index` into its tags.
    /// Returns the image that was used.
    pub fn embed_folder_cover(&mut self, index: usize) -> Result<PathBuf, PlayerError> {
        let result = self.try_embed_folder_cover(index);
        match &result {
            Ok(image) => self.notify(format!("embedded {}", image.display())),
            Err(e) => {
                tracing::warn!(index, error = %e, "embedding cover failed");
                self.notify(e.to_string());
            }
        }
        self.publish();
        result
    }

    fn try_embed_folder_cover(&mut self, index: usize) -> Result<PathBuf, PlayerError> {
        let Some(track) = self.playlist.get(index).cloned() else {
            return Err(PlayerError::Playlist(format!("no track at position {index}")));
        };
        let dir = track
            .path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let Some(image) = tags::find_folder_cover(dir) else {
            return Err(PlayerError::Metadata {
                path: track.path.clone(),
                reason: "no cover image in its folder".to_string(),
            });
        };
        let bytes = std::fs::read(&image)?;
        tags::embed_art(&track.path, &bytes)?;

        let cover = self.art.cover_art(&track).map(Arc::new);
        if let Some(s) = self.session.as_mut().filter(|s| s.index == index) {
            s.cover = cover;
        }
        Ok(image)
    }

    fn replace_tracks(&mut self, tracks: Vec<Track>) {
        self.stop();
        self.feed.clear();
        self.playlist.replace(tracks);
        if let Ok(mut t) = self.tracks.lock() {
            *t = self.playlist.tracks();
        }
        if let Ok(mut info) = self.info.lock() {
            info.library_rev += 1;
        }
        tracing::info!(tracks = self.playlist.len(), "playlist replaced");
        self.publish();
    }

    // ---- workers ------------------------------------------------------

    fn spawn_decode(&self, req: DecodeRequest, index: usize) {
        let tx = self.jobs_tx.clone();
        let transcoder = Arc::clone(&self.transcoder);
        let epoch = self.epoch;
        thread::spawn(move || {
            let result = transcoder.decode(&req);
            let _ = tx.send(JobResult::Decoded {
                epoch,
                index,
                offset: req.start,
                result,
            });
        });
    }

    fn schedule_preview(&mut self, track: &Track, key: TrackKey) {
        if self.feed.has_snapshot(&key) || self.preview_in_flight.as_ref() == Some(&key) {
            return;
        }
        self.preview_in_flight = Some(key.clone());
        let tx = self.jobs_tx.clone();
        let transcoder = Arc::clone(&self.transcoder);
        let feed = Arc::clone(&self.feed);
        let track = track.clone();
        thread::spawn(move || {
            let result = feed.preload_pcm(&track, transcoder.as_ref());
            let _ = tx.send(JobResult::Preview { key, result });
        });
    }

    /// Drain worker results and radio events, then advance the playlist if
    /// the current track has ended. Called periodically by the audio thread.
    pub fn tick(&mut self) {
        while let Ok(job) = self.jobs_rx.try_recv() {
            self.on_job(job);
        }
        while let Ok(ev) = self.radio_rx.try_recv() {
            self.on_radio_event(ev);
        }
        self.check_track_end();
        self.publish();
    }

    fn on_job(&mut self, job: JobResult) {
        match job {
            JobResult::Decoded {
                epoch,
                index,
                offset,
                result,
            } => {
                let current = self.pending.is_some_and(|p| p.epoch == epoch);
                if epoch != self.epoch || !current {
                    self.discarded += 1;
                    tracing::debug!(epoch, current = self.epoch, "discarding stale decode");
                    return;
                }
                match result {
                    // Decoding from at or past the last frame.
                    Ok(pcm) if pcm.is_empty() && !offset.is_zero() => {
                        tracing::debug!(index, ?offset, "transcode seek produced no audio");
                        self.pending = None;
                        self.finish_track();
                    }
                    Ok(pcm) => self.commit_decode(pcm, offset),
                    Err(e) => {
                        self.pending = None;
                        if let Some(next) = self.track_failed(index, e) {
                            self.start_track(next);
                        }
                    }
                }
            }
            JobResult::Preview { key, result } => {
                if self.preview_in_flight.as_ref() == Some(&key) {
                    self.preview_in_flight = None;
                }
                let current = self.session.as_ref().is_some_and(|s| s.key == key);
                if !current {
                    self.discarded += 1;
                    return;
                }
                match result {
                    Ok(pcm) => self.feed.install(key, pcm),
                    // The meter just stays empty.
                    Err(e) => tracing::debug!(error = %e, "visualizer preload failed"),
                }
            }
        }
    }

    fn commit_decode(&mut self, pcm: PcmBuffer, offset: Duration) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if offset.is_zero() {
            session.duration = Some(pcm.duration());
            self.feed.adopt(session.key.clone(), &pcm);
        }
        session.load_offset = offset;
        let key = session.key.clone();
        let index = session.index;

        if let Err(e) = self.backend.load(BackendSource::Buffer(Arc::new(pcm))) {
            if let Some(next) = self.track_failed(index, e) {
                self.start_track(next);
            }
            return;
        }
        self.failures = 0;
        self.tracker.start(offset);
        if pending.resume {
            self.backend.play();
        } else {
            self.tracker.pause();
        }
        tracing::debug!(index, ?offset, "transcoded buffer loaded");

        if let Some(track) = self.playlist.get(index).cloned() {
            self.schedule_preview(&track, key);
        }
    }

    fn on_radio_event(&mut self, ev: RadioEvent) {
        let RadioEvent::Ended { session_id, reason } = ev;
        if self.radio.as_ref().map(|r| r.id()) != Some(session_id) {
            return;
        }
        tracing::info!(session_id, %reason, "radio stream ended");
        self.stop();
        self.notify(format!("radio disconnected: {reason}"));
    }

    fn check_track_end(&mut self) {
        if self.radio.is_some() || self.pending.is_some() {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let (state, pos) = self.tracker.snapshot();
        if state != PlaybackState::Playing {
            return;
        }
        let reached_end = session.duration.is_some_and(|d| pos >= d);
        if !(reached_end || self.backend.is_drained()) {
            return;
        }

        tracing::debug!(index = session.index, ?pos, "track ended");
        self.finish_track();
    }

    /// The current track is done: repeat it, advance, or stop.
    fn finish_track(&mut self) {
        match self.playlist.auto_next() {
            Some(i) => self.load_track(i),
            None => self.stop(),
        }
    }

    // ---- shared state -------------------------------------------------

    fn notify(&self, msg: String) {
        if let Ok(mut info) = self.info.lock() {
            info.notice = Some(msg);
        }
    }

    fn publish(&self) {
        if let Ok(mut o) = self.order.lock() {
            if o.as_slice() != self.playlist.order() {
                *o = self.playlist.order().to_vec();
            }
        }
        let Ok(mut info) = self.info.lock() else {
            return;
        };
        info.index = self.session.as_ref().map(|s| s.index);
        info.state = self.tracker.state();
        info.duration = self.session.as_ref().and_then(|s| s.duration);
        info.is_radio = self.radio.is_some();
        info.radio_url = self.radio.as_ref().map(|r| r.url().to_string());
        info.loading = self.pending.is_some();
        info.cover_art = self.session.as_ref().and_then(|s| s.cover.clone());
        info.volume = self.volume;
        info.shuffle = self.playlist.shuffle();
        info.loop_mode = self.playlist.loop_mode();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.teardown_radio();
        self.backend.stop();
    }
}
