//! Bounded hand-off of live PCM from the radio feeder to the output mixer.

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};
use std::time::Duration;

use rodio::Source;

use super::pcm::PcmFormat;

/// Consumer end handed to the backend.
pub struct PcmStream {
    rx: Receiver<Vec<f32>>,
    format: PcmFormat,
}

/// Create a stream channel holding at most `depth` chunks in flight.
pub fn pcm_channel(format: PcmFormat, depth: usize) -> (SyncSender<Vec<f32>>, PcmStream) {
    let (tx, rx) = sync_channel(depth.max(1));
    (tx, PcmStream { rx, format })
}

impl PcmStream {
    pub fn into_source(self) -> ChannelSource {
        ChannelSource {
            rx: self.rx,
            format: self.format,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

/// `rodio` source that plays chunks as they arrive and emits silence on
/// underrun. Ends once the feeder hangs up and everything queued was played.
pub struct ChannelSource {
    rx: Receiver<Vec<f32>>,
    format: PcmFormat,
    chunk: Vec<f32>,
    pos: usize,
}

impl Iterator for ChannelSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        loop {
            if let Some(&s) = self.chunk.get(self.pos) {
                self.pos += 1;
                return Some(s);
            }
            match self.rx.try_recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(TryRecvError::Empty) => return Some(0.0),
                Err(TryRecvError::Disconnected) => return None,
            }
        }
    }
}

impl Source for ChannelSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.format.channels
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
