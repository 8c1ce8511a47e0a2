//! `rodio` implementation of the output backend.
//!
//! Every load builds a fresh paused `Sink`; seeking a file rebuilds the sink
//! and skips into the decoder.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use super::backend::{BackendSource, OutputBackend};
use super::error::PlayerError;
use super::pcm::PcmBuffer;

enum Loaded {
    File(PathBuf),
    Buffer(Arc<PcmBuffer>),
    Stream,
}

pub struct RodioBackend {
    stream: OutputStream,
    sink: Option<Sink>,
    loaded: Option<Loaded>,
    volume: f32,
    paused: bool,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, PlayerError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlayerError::BackendUnavailable(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped, which garbles the TUI.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            sink: None,
            loaded: None,
            volume: 1.0,
            paused: true,
        })
    }

    fn new_sink(&self) -> Sink {
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.set_volume(self.volume);
        sink
    }

    /// Create a paused sink for `path` that starts playback at `start_at`.
    fn file_sink_at(&self, path: &Path, start_at: Duration) -> Result<Sink, PlayerError> {
        let file = File::open(path).map_err(|e| PlayerError::decode(path, e))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| PlayerError::decode(path, e))?
            // `skip_duration` is the seeking primitive; Duration::ZERO is fine.
            .skip_duration(start_at);

        let sink = self.new_sink();
        sink.append(source);
        Ok(sink)
    }

    fn buffer_sink_at(&self, buf: &PcmBuffer, start_at: Duration) -> Sink {
        let source = SamplesBuffer::new(buf.channels(), buf.sample_rate(), buf.to_f32())
            .skip_duration(start_at);
        let sink = self.new_sink();
        sink.append(source);
        sink
    }

    fn replace_sink(&mut self, sink: Sink) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        if !self.paused {
            sink.play();
        }
        self.sink = Some(sink);
    }
}

impl OutputBackend for RodioBackend {
    fn load(&mut self, source: BackendSource) -> Result<(), PlayerError> {
        self.stop();
        let (sink, loaded) = match source {
            BackendSource::File(path) => (self.file_sink_at(&path, Duration::ZERO)?, Loaded::File(path)),
            BackendSource::Buffer(buf) => (self.buffer_sink_at(&buf, Duration::ZERO), Loaded::Buffer(buf)),
            BackendSource::Stream(stream) => {
                let sink = self.new_sink();
                sink.append(stream.into_source());
                (sink, Loaded::Stream)
            }
        };
        self.sink = Some(sink);
        self.loaded = Some(loaded);
        self.paused = true;
        Ok(())
    }

    fn play(&mut self) {
        if let Some(s) = &self.sink {
            s.play();
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        if let Some(s) = &self.sink {
            s.pause();
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        self.play();
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.loaded = None;
        self.paused = true;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(s) = &self.sink {
            s.set_volume(self.volume);
        }
    }

    fn seek_to(&mut self, offset: Duration) -> Result<(), PlayerError> {
        let sink = match &self.loaded {
            Some(Loaded::File(path)) => self.file_sink_at(path, offset)?,
            Some(Loaded::Buffer(buf)) => self.buffer_sink_at(buf, offset),
            Some(Loaded::Stream) | None => return Ok(()),
        };
        self.replace_sink(sink);
        Ok(())
    }

    fn is_drained(&self) -> bool {
        self.sink.as_ref().map(|s| s.empty()).unwrap_or(true)
    }
}
