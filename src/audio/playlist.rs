//! Track list, shuffle order and play queue owned by the controller.
//!
//! The `queue` holds track indices in play order and is kept consistent with
//! the current shuffle `order`. Cursor movement implements the loop policy.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::library::Track;

use super::types::LoopMode;

pub(crate) fn reorder_queue_in_place(
    queue: &mut Vec<usize>,
    tracks_len: usize,
    shuffle: bool,
    order: &[usize],
) {
    // Remove out-of-range indices first.
    queue.retain(|&i| i < tracks_len);
    if !shuffle {
        // Non-shuffle mode: keep a stable ascending order.
        queue.sort_unstable();
        return;
    }

    // Build a position map for quick ordering lookups and sort accordingly.
    let mut pos_map = vec![usize::MAX; tracks_len];
    for (p, &ti) in order.iter().enumerate() {
        if ti < pos_map.len() {
            pos_map[ti] = p;
        }
    }
    queue.sort_by_key(|&ti| pos_map.get(ti).copied().unwrap_or(usize::MAX));
}

pub struct Playlist {
    tracks: Arc<Vec<Track>>,
    shuffle: bool,
    order: Vec<usize>,
    queue: Vec<usize>,
    queue_pos: usize,
    current: Option<usize>,
    loop_mode: LoopMode,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        let len = tracks.len();
        Self {
            tracks: Arc::new(tracks),
            shuffle: false,
            order: (0..len).collect(),
            queue: (0..len).collect(),
            queue_pos: 0,
            current: None,
            loop_mode: LoopMode::default(),
        }
    }

    /// Swap in a new track list. Queue and cursor reset; policy is kept.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        let shuffle = self.shuffle;
        let loop_mode = self.loop_mode;
        *self = Self::new(tracks);
        self.loop_mode = loop_mode;
        if shuffle {
            self.set_shuffle(true);
        }
    }

    pub fn tracks(&self) -> Arc<Vec<Track>> {
        Arc::clone(&self.tracks)
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn queue(&self) -> &[usize] {
        &self.queue
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    /// Make `index` current. An index outside the queue becomes a
    /// single-entry queue.
    pub fn set_current(&mut self, index: usize) {
        if let Some(pos) = self.queue.iter().position(|&x| x == index) {
            self.queue_pos = pos;
        } else {
            self.queue = vec![index];
            self.queue_pos = 0;
        }
        self.current = Some(index);
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.shuffle);
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.shuffle = on;
        if on {
            self.order.shuffle(&mut rand::rng());
        } else {
            self.order = (0..self.tracks.len()).collect();
        }
        // Membership is controlled via `set_queue`; only the ordering follows shuffle.
        if !self.queue.is_empty() {
            reorder_queue_in_place(&mut self.queue, self.tracks.len(), self.shuffle, &self.order);
            self.sync_queue_pos();
        }
    }

    /// Replace the play queue. The queue is always ordered by the current
    /// shuffle order, whatever order the caller used.
    pub fn set_queue(&mut self, mut queue: Vec<usize>) {
        reorder_queue_in_place(&mut queue, self.tracks.len(), self.shuffle, &self.order);
        self.queue = queue;
        self.sync_queue_pos();
    }

    fn sync_queue_pos(&mut self) {
        self.queue_pos = self
            .current
            .and_then(|i| self.queue.iter().position(|&x| x == i))
            .unwrap_or(0);
    }

    /// Manual next: wraps only under `LoopAll`, never repeats one.
    pub fn manual_next(&self) -> Option<usize> {
        if self.queue.is_empty() {
            return None;
        }
        if self.current.is_none() {
            return self.queue.first().copied();
        }
        if self.queue_pos + 1 < self.queue.len() {
            Some(self.queue[self.queue_pos + 1])
        } else if self.loop_mode == LoopMode::LoopAll {
            self.queue.first().copied()
        } else {
            None
        }
    }

    /// Manual previous: wraps only under `LoopAll`, never repeats one.
    pub fn manual_prev(&self) -> Option<usize> {
        if self.queue.is_empty() {
            return None;
        }
        if self.current.is_none() {
            return self.queue.first().copied();
        }
        if self.queue_pos > 0 {
            Some(self.queue[self.queue_pos - 1])
        } else if self.loop_mode == LoopMode::LoopAll {
            self.queue.last().copied()
        } else {
            None
        }
    }

    /// Track to play when the current one ends. `None` means stop.
    pub fn auto_next(&self) -> Option<usize> {
        match self.loop_mode {
            LoopMode::LoopOne => self.current.or_else(|| self.queue.first().copied()),
            LoopMode::LoopAll | LoopMode::NoLoop => self.manual_next(),
        }
    }

    /// Track to try after the current one failed to load. Never the same one
    /// again, even under `LoopOne`.
    pub fn after_failure(&self) -> Option<usize> {
        let next = match self.loop_mode {
            LoopMode::LoopOne => {
                if self.queue_pos + 1 < self.queue.len() {
                    Some(self.queue[self.queue_pos + 1])
                } else {
                    self.queue.first().copied()
                }
            }
            LoopMode::LoopAll | LoopMode::NoLoop => self.manual_next(),
        };
        next.filter(|&n| Some(n) != self.current)
    }
}
