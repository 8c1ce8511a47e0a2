//! Capped PCM snapshot of the current track, served as short windows of
//! sample magnitudes for the amplitude meter.
//!
//! The cap is applied once, when the snapshot is produced. Reads never decode
//! and never fail: a position outside the snapshot yields an empty frame.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::error::PlayerError;
use super::pcm::PcmBuffer;
use super::transcode::{DecodeRequest, Transcoder};
use crate::library::{Track, TrackKey};

struct Snapshot {
    key: TrackKey,
    pcm: Arc<PcmBuffer>,
}

pub struct VisualizerFeed {
    cap: Duration,
    window: Duration,
    current: RwLock<Option<Snapshot>>,
}

impl VisualizerFeed {
    pub fn new(cap: Duration, window: Duration) -> Self {
        Self {
            cap,
            window,
            current: RwLock::new(None),
        }
    }

    /// Whether a snapshot for exactly this (unchanged) track is cached.
    pub fn has_snapshot(&self, key: &TrackKey) -> bool {
        self.current
            .read()
            .map(|c| c.as_ref().is_some_and(|s| &s.key == key))
            .unwrap_or(false)
    }

    /// Decode up to the cap for `track`. Blocking: call from a worker.
    ///
    /// Does not install the result; the caller decides whether the track is
    /// still current and then calls `install`.
    pub fn preload_pcm(
        &self,
        track: &Track,
        transcoder: &dyn Transcoder,
    ) -> Result<PcmBuffer, PlayerError> {
        let mut pcm = transcoder.decode(&DecodeRequest::capped(&track.path, self.cap))?;
        pcm.truncate_to(self.cap);
        Ok(pcm)
    }

    /// Install `pcm` as the snapshot for `key`, enforcing the cap.
    pub fn install(&self, key: TrackKey, mut pcm: PcmBuffer) {
        pcm.truncate_to(self.cap);
        if let Ok(mut c) = self.current.write() {
            *c = Some(Snapshot {
                key,
                pcm: Arc::new(pcm),
            });
        }
    }

    /// Reuse the head of an already decoded playback buffer as the snapshot.
    pub fn adopt(&self, key: TrackKey, full: &PcmBuffer) {
        if self.has_snapshot(&key) {
            return;
        }
        self.install(key, full.prefix(self.cap));
    }

    pub fn clear(&self) {
        if let Ok(mut c) = self.current.write() {
            *c = None;
        }
    }

    /// Byte length of the cached snapshot, if any.
    pub fn snapshot_len(&self) -> Option<usize> {
        self.current
            .read()
            .ok()
            .and_then(|c| c.as_ref().map(|s| s.pcm.byte_len()))
    }

    /// Magnitudes (0.0..=1.0) of one window starting at `position`.
    pub fn get_viz_frame(&self, position: Duration) -> Vec<f32> {
        let Ok(guard) = self.current.read() else {
            return Vec::new();
        };
        let Some(snap) = guard.as_ref() else {
            return Vec::new();
        };
        let pcm = &snap.pcm;
        let rate = pcm.sample_rate() as f64;
        let channels = pcm.channels() as usize;

        let start_frame = (position.as_secs_f64() * rate).floor() as usize;
        let start = start_frame.saturating_mul(channels);
        if start >= pcm.sample_count() {
            return Vec::new();
        }
        let window_frames = (self.window.as_secs_f64() * rate).round() as usize;
        pcm.samples(start, window_frames * channels)
            .map(|s| (s as f32 / i16::MAX as f32).abs().min(1.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::PcmFormat;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FMT: PcmFormat = PcmFormat {
        sample_rate: 1_000,
        channels: 2,
    };

    /// Ignores the cap and returns `secs` of a constant half-scale signal.
    struct LongDecoder {
        secs: usize,
        calls: AtomicUsize,
    }

    impl Transcoder for LongDecoder {
        fn decode(&self, _req: &DecodeRequest) -> Result<PcmBuffer, PlayerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let samples = self.secs * FMT.sample_rate as usize * FMT.channels as usize;
            let bytes = (0..samples).flat_map(|_| 16_384i16.to_le_bytes()).collect();
            Ok(PcmBuffer::new(bytes, FMT))
        }
    }

    fn key(name: &str) -> TrackKey {
        TrackKey {
            path: PathBuf::from(name),
            len: Some(1),
            modified: None,
        }
    }

    fn feed() -> VisualizerFeed {
        VisualizerFeed::new(Duration::from_secs(5), Duration::from_millis(80))
    }

    #[test]
    fn preload_longer_than_cap_is_exactly_cap_sized() {
        let feed = feed();
        let dec = LongDecoder {
            secs: 12,
            calls: AtomicUsize::new(0),
        };
        let track = Track::bare(PathBuf::from("/music/long.m4a"));
        let pcm = feed.preload_pcm(&track, &dec).unwrap();
        // 5 s * 1000 frames/s * 2 channels * 2 bytes
        assert_eq!(pcm.byte_len(), 20_000);
        assert_eq!(pcm.sample_count(), 5 * 1_000 * 2);
    }

    #[test]
    fn frame_is_window_sized_and_normalised() {
        let feed = feed();
        let dec = LongDecoder {
            secs: 2,
            calls: AtomicUsize::new(0),
        };
        let pcm = feed
            .preload_pcm(&Track::bare(PathBuf::from("/a.mp3")), &dec)
            .unwrap();
        feed.install(key("/a.mp3"), pcm);

        let frame = feed.get_viz_frame(Duration::from_millis(500));
        assert_eq!(frame.len(), 80 * 2);
        assert!(frame.iter().all(|m| (*m - 0.5).abs() < 0.01));
    }

    #[test]
    fn frame_beyond_snapshot_is_empty() {
        let feed = feed();
        assert!(feed.get_viz_frame(Duration::from_secs(1)).is_empty());

        let dec = LongDecoder {
            secs: 2,
            calls: AtomicUsize::new(0),
        };
        let pcm = feed
            .preload_pcm(&Track::bare(PathBuf::from("/a.mp3")), &dec)
            .unwrap();
        feed.install(key("/a.mp3"), pcm);

        assert!(feed.get_viz_frame(Duration::from_secs(2)).is_empty());
        assert!(feed.get_viz_frame(Duration::from_secs(3600)).is_empty());
        // Partially covered window is clipped, not padded.
        assert_eq!(feed.get_viz_frame(Duration::from_millis(1_960)).len(), 40 * 2);
    }

    #[test]
    fn adopt_reuses_existing_snapshot_and_caps() {
        let feed = feed();
        let full = PcmBuffer::new(vec![0; FMT.bytes_per_second() * 9], FMT);
        feed.adopt(key("/x.opus"), &full);
        assert!(feed.has_snapshot(&key("/x.opus")));
        assert_eq!(feed.snapshot_len(), Some(FMT.bytes_per_second() * 5));

        let other = PcmBuffer::new(vec![0; 8], FMT);
        feed.adopt(key("/x.opus"), &other);
        assert_eq!(feed.snapshot_len(), Some(FMT.bytes_per_second() * 5));

        feed.clear();
        assert!(!feed.has_snapshot(&key("/x.opus")));
        assert_eq!(feed.snapshot_len(), None);
    }
}
