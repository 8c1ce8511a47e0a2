//! Amplitude bars with peak-hold, fed from raw visualizer frames.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Peak {
    level: f32,
    at: Option<Instant>,
}

pub struct Meter {
    bars: Vec<f32>,
    peaks: Vec<Peak>,
    hold: Duration,
}

impl Meter {
    pub fn new(bars: usize, hold: Duration) -> Self {
        Self {
            bars: vec![0.0; bars],
            peaks: vec![
                Peak {
                    level: 0.0,
                    at: None,
                };
                bars
            ],
            hold,
        }
    }

    /// Fold one frame of magnitudes into the bars. An empty frame drops the
    /// bars to zero; peaks still hold for their full time.
    pub fn update(&mut self, frame: &[f32], now: Instant) {
        let n = self.bars.len();
        if n == 0 {
            return;
        }
        let per_bar = frame.len().div_ceil(n).max(1);
        for (i, bar) in self.bars.iter_mut().enumerate() {
            *bar = frame
                .iter()
                .skip(i * per_bar)
                .take(per_bar)
                .fold(0.0f32, |m, &s| m.max(s))
                .clamp(0.0, 1.0);
        }

        for (peak, &bar) in self.peaks.iter_mut().zip(&self.bars) {
            let expired = peak
                .at
                .is_none_or(|at| now.saturating_duration_since(at) >= self.hold);
            if bar >= peak.level || expired {
                *peak = Peak {
                    level: bar,
                    at: Some(now),
                };
            }
        }
    }

    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    pub fn peaks(&self) -> impl Iterator<Item = f32> + '_ {
        self.peaks.iter().map(|p| p.level)
    }

    pub fn reset(&mut self) {
        self.bars.iter_mut().for_each(|b| *b = 0.0);
        self.peaks.iter_mut().for_each(|p| {
            p.level = 0.0;
            p.at = None;
        });
    }
}
