//! Wall-clock playback position, independent of the output backend.
//!
//! The backend's own clock restarts whenever a source is (re)loaded, which
//! happens on every seek of a transcoded file. The tracker instead keeps an
//! explicit timeline that only changes at transport transitions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::clock::Clock;
use super::types::PlaybackState;

/// `t_start` is stored as the pair (clock reading, position at that reading)
/// so an offset larger than the clock's current value never underflows.
#[derive(Debug, Clone, Copy)]
struct Timeline {
    state: PlaybackState,
    anchor: Duration,
    accumulated: Duration,
    /// Position pinned at `accumulated` regardless of state.
    held: bool,
}

impl Timeline {
    fn position(&self, now: Duration) -> Duration {
        if self.held {
            return self.accumulated;
        }
        match self.state {
            PlaybackState::Playing => self.accumulated + now.saturating_sub(self.anchor),
            PlaybackState::Paused | PlaybackState::Stopped => self.accumulated,
        }
    }
}

pub struct PositionTracker {
    clock: Arc<dyn Clock>,
    timeline: Mutex<Timeline>,
}

impl PositionTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timeline: Mutex::new(Timeline {
                state: PlaybackState::Stopped,
                anchor: Duration::ZERO,
                accumulated: Duration::ZERO,
                held: false,
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Timeline, Duration)) {
        let now = self.clock.now();
        if let Ok(mut tl) = self.timeline.lock() {
            f(&mut tl, now);
        }
    }

    /// Begin playing from `offset`.
    pub fn start(&self, offset: Duration) {
        self.update(|tl, now| {
            tl.state = PlaybackState::Playing;
            tl.anchor = now;
            tl.accumulated = offset;
            tl.held = false;
        });
    }

    /// Freeze the position. No-op unless playing.
    pub fn pause(&self) {
        self.update(|tl, now| {
            if tl.state == PlaybackState::Playing {
                tl.accumulated = tl.position(now);
                tl.state = PlaybackState::Paused;
            }
        });
    }

    /// Continue from the frozen position. No-op unless paused.
    pub fn resume(&self) {
        self.update(|tl, now| {
            if tl.state == PlaybackState::Paused {
                tl.anchor = now;
                tl.state = PlaybackState::Playing;
            }
        });
    }

    /// Re-baseline to `offset` after a seek, keeping the play/pause state.
    pub fn rebase(&self, offset: Duration) {
        self.update(|tl, now| {
            tl.anchor = now;
            tl.accumulated = offset;
        });
    }

    /// Pin the position at `offset` while a reload is in flight. The
    /// play/pause state is kept; pause and resume still toggle it, and the
    /// next `start` releases the hold.
    pub fn hold(&self, offset: Duration) {
        self.update(|tl, now| {
            tl.anchor = now;
            tl.accumulated = offset;
            tl.held = true;
        });
    }

    /// Back to zero, stopped. Used on stop and on every track change.
    pub fn reset(&self) {
        self.update(|tl, now| {
            tl.state = PlaybackState::Stopped;
            tl.anchor = now;
            tl.accumulated = Duration::ZERO;
            tl.held = false;
        });
    }

    pub fn position(&self) -> Duration {
        self.snapshot().1
    }

    pub fn state(&self) -> PlaybackState {
        self.snapshot().0
    }

    /// State and position read under one lock.
    pub fn snapshot(&self) -> (PlaybackState, Duration) {
        let now = self.clock.now();
        match self.timeline.lock() {
            Ok(tl) => (tl.state, tl.position(now)),
            Err(_) => (PlaybackState::Stopped, Duration::ZERO),
        }
    }
}
