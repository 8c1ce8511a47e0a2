use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::App;
use crate::audio::{AudioCmd, AudioPlayer, PlaybackState};
use crate::config::{self, SessionSettings};
use crate::ui;

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Snapshot of the prior order when shuffle was turned on; used to
    /// detect the new randomized order and reselect its first item.
    pub pending_shuffle_reselect_from: Option<Vec<usize>>,
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    pending_zz: bool,
    /// In-memory session record (favourites added during this run).
    pub session: SessionSettings,
}

impl EventLoopState {
    pub fn new(session: SessionSettings) -> Self {
        Self {
            pending_shuffle_reselect_from: None,
            pending_gg: false,
            pending_zz: false,
            session,
        }
    }
}

/// Main terminal event loop: polls the engine at the configured cadence,
/// draws, and handles input. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = audio_player.handle();
    let poll = Duration::from_millis(settings.ui.poll_ms.max(1));

    loop {
        app.sync(&handle, Instant::now());

        // If shuffle just turned on, reselect the first track in the new randomized order.
        if let Some(old) = state.pending_shuffle_reselect_from.as_ref() {
            if app.info.shuffle {
                let display = app.display_indices();
                if display.as_slice() != old.as_slice() {
                    if let Some(&first) = display.first() {
                        app.set_selected(first);
                    }
                    state.pending_shuffle_reselect_from = None;
                }
            }
        }

        // Keep the engine's queue in sync with the current list.
        if app.queue_dirty {
            let _ = audio_player.send(AudioCmd::SetQueue(app.display_indices()));
            app.clear_queue_dirty();
        }

        let display = app.display_indices();
        terminal.draw(|f| ui::draw(f, app, &display, &settings.ui, &settings.controls))?;

        if event::poll(poll)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, audio_player, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn export_path(app: &App) -> PathBuf {
    app.current_dir
        .as_deref()
        .map(PathBuf::from)
        .filter(|d| d.is_dir())
        .unwrap_or_default()
        .join("cadenza.m3u")
}

/// Returns `true` when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    state: &mut EventLoopState,
) -> bool {
    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }
    if key.code != KeyCode::Char('z') {
        state.pending_zz = false;
    }

    match key.code {
        KeyCode::Char('q') => {
            audio_player.quit();
            return true;
        }
        KeyCode::Char('s') => {
            if !app.info.shuffle {
                state.pending_shuffle_reselect_from = Some(app.display_indices());
            } else {
                state.pending_shuffle_reselect_from = None;
                app.set_selected(0);
            }
            let _ = audio_player.send(AudioCmd::ToggleShuffle);
        }
        KeyCode::Char('r') => {
            let _ = audio_player.send(AudioCmd::SetLoopMode(app.info.loop_mode.cycle()));
        }
        KeyCode::Char('z') => {
            if state.pending_zz {
                state.pending_zz = false;
                if let Some(idx) = app.info.index {
                    app.follow_playback_on();
                    app.set_selected(idx);
                }
            } else {
                state.pending_zz = true;
            }
        }
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                if let Some(&first) = app.display_indices().first() {
                    app.set_selected(first);
                }
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            if let Some(&last) = app.display_indices().last() {
                app.set_selected(last);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            if app.has_tracks() {
                let is_playing_selected = app.info.state == PlaybackState::Playing
                    && !app.info.is_radio
                    && app.info.index == Some(app.selected);
                if !is_playing_selected {
                    app.follow_playback_on();
                    app.set_pending_follow_index(app.selected);
                    let _ = audio_player.send(AudioCmd::Play(app.selected));
                }
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            app.follow_playback_on();
            if app.info.state == PlaybackState::Stopped && app.info.index.is_none() {
                if app.has_tracks() {
                    app.set_pending_follow_index(app.selected);
                    let _ = audio_player.send(AudioCmd::Play(app.selected));
                }
            } else {
                let _ = audio_player.send(AudioCmd::TogglePause);
            }
        }
        KeyCode::Char('x') => {
            let _ = audio_player.send(AudioCmd::Stop);
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            let _ = audio_player.send(AudioCmd::Next);
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            let _ = audio_player.send(AudioCmd::Prev);
        }
        KeyCode::Char('L') | KeyCode::Right => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            let _ = audio_player.send(AudioCmd::SeekBy(secs));
        }
        KeyCode::Char('H') | KeyCode::Left => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            let _ = audio_player.send(AudioCmd::SeekBy(-secs));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let v = app.info.volume + settings.controls.volume_step;
            let _ = audio_player.send(AudioCmd::SetVolume(v));
        }
        KeyCode::Char('-') => {
            let v = app.info.volume - settings.controls.volume_step;
            let _ = audio_player.send(AudioCmd::SetVolume(v));
        }
        KeyCode::Char('f') => {
            if let Some(url) = app.info.radio_url.clone().filter(|_| app.info.is_radio) {
                if state.session.add_radio_favourite(url.as_str()) {
                    info!(%url, "added radio favourite");
                } else if state.session.remove_radio_favourite(&url) {
                    info!(%url, "removed radio favourite");
                }
            }
        }
        KeyCode::Char('R') => {
            if let Some(url) = app.next_favourite(state.session.radio_favourites()) {
                let _ = audio_player.send(AudioCmd::PlayRadio(url.to_string()));
            }
        }
        KeyCode::Char('A') => {
            if app.has_tracks() {
                let _ = audio_player.send(AudioCmd::EmbedFolderCover(app.selected));
            }
        }
        KeyCode::Char('e') => {
            let _ = audio_player.send(AudioCmd::ExportPlaylist(export_path(app)));
        }
        _ => {}
    }

    false
}
