//! Raw interleaved s16le PCM as produced by the external decoders.

use std::io::{self, Read};
use std::time::Duration;

pub const BYTES_PER_SAMPLE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.bytes_per_frame()
    }

    /// Byte length of `d` worth of audio, rounded down to a whole frame.
    pub fn bytes_for(&self, d: Duration) -> usize {
        let frames = (d.as_secs_f64() * self.sample_rate as f64).floor() as usize;
        frames * self.bytes_per_frame()
    }
}

#[derive(Debug, Clone)]
pub struct PcmBuffer {
    bytes: Vec<u8>,
    format: PcmFormat,
}

impl PcmBuffer {
    /// Wrap raw bytes. A trailing partial frame is dropped.
    pub fn new(mut bytes: Vec<u8>, format: PcmFormat) -> Self {
        let whole = bytes.len() - bytes.len() % format.bytes_per_frame();
        bytes.truncate(whole);
        Self { bytes, format }
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.bytes.len() / BYTES_PER_SAMPLE
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.bytes.len() as f64 / self.format.bytes_per_second() as f64)
    }

    /// Keep at most `max` of audio.
    pub fn truncate_to(&mut self, max: Duration) {
        let cap = self.format.bytes_for(max);
        self.bytes.truncate(cap);
    }

    /// A copy of the first `max` of audio.
    pub fn prefix(&self, max: Duration) -> Self {
        let cap = self.format.bytes_for(max).min(self.bytes.len());
        Self {
            bytes: self.bytes[..cap].to_vec(),
            format: self.format,
        }
    }

    /// Samples `start..start + len`, clipped to the buffer.
    pub fn samples(&self, start: usize, len: usize) -> impl Iterator<Item = i16> + '_ {
        let from = (start * BYTES_PER_SAMPLE).min(self.bytes.len());
        let to = ((start + len) * BYTES_PER_SAMPLE).min(self.bytes.len());
        s16le_samples(&self.bytes[from..to])
    }

    /// Whole buffer as f32 samples for the output backend.
    pub fn to_f32(&self) -> Vec<f32> {
        s16le_to_f32(&self.bytes)
    }
}

pub fn s16le_samples(bytes: &[u8]) -> impl Iterator<Item = i16> + '_ {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
}

pub fn s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    s16le_samples(bytes)
        .map(|s| s as f32 / i16::MAX as f32)
        .collect()
}

/// Read `reader` to the end or until `cap` bytes, whichever comes first.
pub fn read_capped(reader: impl Read, cap: Option<usize>) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match cap {
        Some(cap) => {
            reader.take(cap as u64).read_to_end(&mut out)?;
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut out)?;
        }
    }
    Ok(out)
}
