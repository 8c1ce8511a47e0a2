use super::*;
use crate::audio::{PlaybackInfo, PlaybackState};
use crate::library::Track;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn t(title: &str) -> Track {
    Track::bare(PathBuf::from(format!("/music/{title}.mp3")))
}

fn app(n: usize) -> App {
    let tracks = (0..n).map(|i| t(&format!("song{i}"))).collect();
    App::new(Arc::new(tracks), Meter::new(4, Duration::from_millis(600)))
}

fn playing(index: usize) -> PlaybackInfo {
    PlaybackInfo {
        index: Some(index),
        state: PlaybackState::Playing,
        ..PlaybackInfo::default()
    }
}

#[test]
fn display_indices_follow_engine_order_only_when_shuffled() {
    let mut app = app(4);
    let now = Instant::now();
    app.apply(PlaybackInfo::default(), vec![2, 0, 3, 1], None, &[], now);
    assert_eq!(app.display_indices(), vec![0, 1, 2, 3]);

    let shuffled = PlaybackInfo {
        shuffle: true,
        ..PlaybackInfo::default()
    };
    app.apply(shuffled, vec![2, 0, 3, 1], None, &[], now);
    assert_eq!(app.display_indices(), vec![2, 0, 3, 1]);
}

#[test]
fn order_for_a_different_playlist_is_ignored() {
    let mut app = app(3);
    app.apply(PlaybackInfo::default(), vec![4, 3, 2, 1, 0], None, &[], Instant::now());
    assert_eq!(app.next_in_view_from(2), Some(0));
}

#[test]
fn next_prev_wrap_in_view() {
    let mut app = app(3);
    app.set_selected(2);
    app.next();
    assert_eq!(app.selected, 0);
    app.prev();
    assert_eq!(app.selected, 2);
}

#[test]
fn follow_playback_moves_cursor_to_now_playing() {
    let mut app = app(5);
    app.apply(playing(3), vec![], Some(Duration::ZERO), &[], Instant::now());
    assert_eq!(app.selected, 3);

    app.follow_playback_off();
    app.apply(playing(1), vec![], Some(Duration::ZERO), &[], Instant::now());
    assert_eq!(app.selected, 3);
}

#[test]
fn pending_follow_waits_for_the_requested_track() {
    let mut app = app(5);
    app.set_selected(4);
    app.set_pending_follow_index(4);

    // Engine still reports the previous track.
    app.apply(playing(1), vec![], None, &[], Instant::now());
    assert_eq!(app.selected, 4);
    assert_eq!(app.pending_follow_index, Some(4));

    app.apply(playing(4), vec![], None, &[], Instant::now());
    assert_eq!(app.pending_follow_index, None);
    app.apply(playing(2), vec![], None, &[], Instant::now());
    assert_eq!(app.selected, 2);
}

#[test]
fn set_tracks_resets_selection_and_marks_queue() {
    let mut app = app(5);
    app.set_selected(4);
    app.clear_queue_dirty();
    app.set_tracks(Arc::new(vec![t("only")]), 7);
    assert_eq!(app.selected, 0);
    assert!(app.queue_dirty);
    assert_eq!(app.display_indices(), vec![0]);
}

#[test]
fn favourites_cycle() {
    let mut app = app(0);
    let favs = vec!["http://a".to_string(), "http://b".to_string()];
    assert_eq!(app.next_favourite(&favs), Some("http://a"));
    assert_eq!(app.next_favourite(&favs), Some("http://b"));
    assert_eq!(app.next_favourite(&favs), Some("http://a"));
    assert_eq!(app.next_favourite(&[]), None);
}

#[test]
fn meter_bins_frame_into_bars() {
    let mut m = Meter::new(4, Duration::from_millis(600));
    let frame = [0.1, 0.2, 0.9, 0.3, 0.0, 0.0, 0.5, 0.4];
    m.update(&frame, Instant::now());
    assert_eq!(m.bars(), &[0.2, 0.9, 0.0, 0.5]);
}

#[test]
fn meter_peaks_hold_then_fall() {
    let mut m = Meter::new(1, Duration::from_millis(600));
    let t0 = Instant::now();
    m.update(&[0.8], t0);
    m.update(&[0.2], t0 + Duration::from_millis(300));
    assert_eq!(m.bars(), &[0.2]);
    assert_eq!(m.peaks().collect::<Vec<_>>(), vec![0.8]);

    m.update(&[0.2], t0 + Duration::from_millis(700));
    assert_eq!(m.peaks().collect::<Vec<_>>(), vec![0.2]);

    m.update(&[], t0 + Duration::from_millis(800));
    assert_eq!(m.bars(), &[0.0]);
    assert_eq!(m.peaks().collect::<Vec<_>>(), vec![0.2]);

    m.reset();
    assert_eq!(m.peaks().collect::<Vec<_>>(), vec![0.0]);
}
