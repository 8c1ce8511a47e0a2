//! Application model: the front end's copy of playlist and playback state.
//!
//! The `App` never drives the engine directly. The runtime polls the
//! `PlayerHandle` at a fixed cadence and folds the result in via `sync`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::{PlaybackInfo, PlayerHandle};
use crate::library::Track;

use super::meter::Meter;

/// The main application model.
pub struct App {
    pub tracks: Arc<Vec<Track>>,
    pub selected: usize,
    /// Latest engine snapshot.
    pub info: PlaybackInfo,
    /// `None` on radio.
    pub position: Option<Duration>,
    pub meter: Meter,

    pub follow_playback: bool,
    pub pending_follow_index: Option<usize>,
    pub queue_dirty: bool,
    pub current_dir: Option<String>,

    order: Vec<usize>,
    library_rev: u64,
    favourite: Option<usize>,
}

impl App {
    /// Create a new `App` with the provided list of `tracks`.
    pub fn new(tracks: Arc<Vec<Track>>, meter: Meter) -> Self {
        let order = (0..tracks.len()).collect();
        Self {
            tracks,
            selected: 0,
            info: PlaybackInfo::default(),
            position: None,
            meter,
            follow_playback: true,
            pending_follow_index: None,
            queue_dirty: true,
            current_dir: None,
            order,
            library_rev: 0,
            favourite: None,
        }
    }

    /// Pull the latest engine state.
    pub fn sync(&mut self, handle: &PlayerHandle, now: Instant) {
        let info = handle.snapshot();
        if info.library_rev != self.library_rev {
            self.set_tracks(handle.tracks(), info.library_rev);
        }
        let frame = handle.viz_frame();
        self.apply(info, handle.order(), handle.position(), &frame, now);
    }

    /// Swap in a replaced playlist.
    pub fn set_tracks(&mut self, tracks: Arc<Vec<Track>>, rev: u64) {
        self.order = (0..tracks.len()).collect();
        self.tracks = tracks;
        self.library_rev = rev;
        self.selected = 0;
        self.pending_follow_index = None;
        self.meter.reset();
        self.mark_queue_dirty();
    }

    pub(crate) fn apply(
        &mut self,
        info: PlaybackInfo,
        order: Vec<usize>,
        position: Option<Duration>,
        frame: &[f32],
        now: Instant,
    ) {
        if order.len() == self.tracks.len() {
            self.order = order;
        }
        self.position = position;
        self.meter.update(frame, now);

        if let Some(idx) = info.index {
            if self.follow_playback {
                match self.pending_follow_index {
                    Some(pending) if pending == idx => {
                        self.pending_follow_index = None;
                        self.set_selected(idx);
                    }
                    Some(_) => {}
                    None => self.set_selected(idx),
                }
            }
        }
        self.info = info;
    }

    /// Mark the queue as needing to be resent to the engine.
    pub fn mark_queue_dirty(&mut self) {
        self.queue_dirty = true;
    }
    /// Clear the "queue dirty" flag.
    pub fn clear_queue_dirty(&mut self) {
        self.queue_dirty = false;
    }
    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }
    /// Disable follow-playback and clear any pending follow index.
    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
        self.pending_follow_index = None;
    }
    /// Set an index to follow once playback information becomes available.
    pub fn set_pending_follow_index(&mut self, idx: usize) {
        self.pending_follow_index = Some(idx);
    }
    /// Record the current directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    /// Track indices in display order: the engine's shuffle order when
    /// shuffle is on.
    pub fn display_indices(&self) -> Vec<usize> {
        if self.info.shuffle {
            self.order
                .iter()
                .copied()
                .filter(|&i| i < self.tracks.len())
                .collect()
        } else {
            (0..self.tracks.len()).collect()
        }
    }

    /// Return the next visible index in the current display order after `current`.
    /// Wraps around to the first element.
    pub fn next_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(p) => Some(display[(p + 1) % display.len()]),
            None => Some(display[0]),
        }
    }

    /// Return the previous visible index in the current display order before `current`.
    /// Wraps around to the last element.
    pub fn prev_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(0) => Some(display[display.len() - 1]),
            Some(p) => Some(display[p - 1]),
            None => Some(display[display.len() - 1]),
        }
    }

    pub fn set_selected(&mut self, idx: usize) {
        if idx < self.tracks.len() {
            self.selected = idx;
        }
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Move selection to the next visible track.
    pub fn next(&mut self) {
        if let Some(next) = self.next_in_view_from(self.selected) {
            self.selected = next;
        }
    }

    /// Move selection to the previous visible track.
    pub fn prev(&mut self) {
        if let Some(prev) = self.prev_in_view_from(self.selected) {
            self.selected = prev;
        }
    }

    /// Step through `favourites`, wrapping. `None` when there are none.
    pub fn next_favourite<'a>(&mut self, favourites: &'a [String]) -> Option<&'a str> {
        if favourites.is_empty() {
            self.favourite = None;
            return None;
        }
        let i = match self.favourite {
            Some(i) => (i + 1) % favourites.len(),
            None => 0,
        };
        self.favourite = Some(i);
        favourites.get(i).map(String::as_str)
    }
}
