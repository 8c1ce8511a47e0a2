//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, Meter};
use crate::audio::{LoopMode, PlaybackState};
use crate::config::{ControlsSettings, TimeField, UiSettings};

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("zz", "jump to playing");
    map.insert("enter", "play selected song");
    map.insert("space/p", "play/pause");
    map.insert("x", "stop");
    map.insert("h/l", "prev/next song");
    // H/L and +/- are filled dynamically from config.
    map.insert("s", "shuffle");
    map.insert("r", "loop mode");
    map.insert("R", "next radio favourite");
    map.insert("f", "favourite/unfavourite station");
    map.insert("A", "embed folder cover");
    map.insert("e", "export playlist");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating scrub seconds and volume step.
fn controls_text(controls: &ControlsSettings) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "+/-", "enter", "space/p", "x", "gg/G", "zz", "s", "r", "R", "f",
        "A", "e", "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "H/L" => Some(format!("[H/L] scrub -/+{}s", controls.scrub_seconds)),
            "+/-" => Some(format!(
                "[+/-] volume {:+.0}%",
                controls.volume_step * 100.0
            )),
            _ => CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v)),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

fn level_glyph(level: f32) -> char {
    let i = (level.clamp(0.0, 1.0) * (LEVELS.len() - 1) as f32).round() as usize;
    LEVELS[i.min(LEVELS.len() - 1)]
}

/// Two rows: current bars, then held peaks.
fn meter_lines(meter: &Meter) -> Vec<Line<'static>> {
    let bars: String = meter.bars().iter().map(|&b| level_glyph(b)).collect();
    let peaks: String = meter
        .peaks()
        .map(|p| if p > 0.0 { level_glyph(p) } else { ' ' })
        .collect();
    vec![Line::from(bars), Line::from(peaks).dim()]
}

fn status_text(app: &App, ui: &UiSettings) -> String {
    let info = &app.info;
    let mut parts: Vec<String> = Vec::new();

    if app.follow_playback {
        parts.push(" CURSOR: Follow".to_string());
    } else {
        parts.push(" CURSOR: Free-roam".to_string());
    }

    let loop_text = match info.loop_mode {
        LoopMode::NoLoop => "PLAYBACK: No-loop",
        LoopMode::LoopAll => "PLAYBACK: Loop-around",
        LoopMode::LoopOne => "PLAYBACK: Repeat-one",
    };
    parts.push(loop_text.to_string());

    let state = match info.state {
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
        PlaybackState::Stopped => "Stopped",
    };

    if info.is_radio {
        let url = info.radio_url.as_deref().unwrap_or("-");
        parts.push(format!("RADIO: {}", url));
        parts.push(state.to_string());
    } else if let Some(track) = info.index.and_then(|i| app.tracks.get(i)) {
        let elapsed = app.position.unwrap_or_default();
        let total = info.duration.or(track.duration);
        match now_playing_time_text(elapsed, total, ui) {
            Some(time) => parts.push(format!("Song: {} [{}]", track.display, time)),
            None => parts.push(format!("Song: {}", track.display)),
        }
        parts.push(state.to_string());
    } else {
        parts.push(state.to_string());
    }

    if info.loading {
        parts.push("Loading…".to_string());
    }

    if let Some(art) = &info.cover_art {
        parts.push(format!("Art: {} KiB", art.len().div_ceil(1024)));
    }

    if info.shuffle {
        parts.push("Shuffle: ON".to_string());
    } else {
        parts.push("Shuffle: OFF".to_string());
    }

    parts.push(format!("Vol: {:.0}%", info.volume * 100.0));

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {}", dir));
    }

    if let Some(notice) = &info.notice {
        parts.push(format!("! {}", notice));
    }

    parts.join(" • ")
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    display: &[usize],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let status_par = Paragraph::new(status_text(app, ui_settings))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" cadenza ")
                .title_alignment(Alignment::Center),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[0]);

    let meter = Paragraph::new(meter_lines(&app.meter))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" meter "));
    frame.render_widget(meter, chunks[1]);

    // Main list
    {
        // Center the selected item when possible by creating a visible window.
        // Only build ListItems for the visible window.
        let total = display.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let sel_pos = display.iter().position(|&i| i == app.selected).unwrap_or(0);
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let playing = if app.info.is_radio { None } else { app.info.index };
        let visible_items: Vec<ListItem> = display[start..end]
            .iter()
            .filter_map(|&i| app.tracks.get(i).map(|t| (i, t)))
            .map(|(i, track)| {
                if playing == Some(i) {
                    ListItem::new(format!("♪ {}", track.display)).bold()
                } else {
                    ListItem::new(track.display.as_str())
                }
            })
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    let footer = Paragraph::new(controls_text(controls_settings))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ui_with(fields: Vec<TimeField>) -> UiSettings {
        UiSettings {
            now_playing_time_fields: fields,
            now_playing_time_separator: " / ".to_string(),
            ..UiSettings::default()
        }
    }

    #[test]
    fn time_text_joins_configured_fields() {
        let ui = ui_with(vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining]);
        let text = now_playing_time_text(
            Duration::from_secs(65),
            Some(Duration::from_secs(180)),
            &ui,
        );
        assert_eq!(text.as_deref(), Some("01:05 / 03:00 / -01:55"));
    }

    #[test]
    fn time_text_skips_total_when_unknown() {
        let ui = ui_with(vec![TimeField::Elapsed, TimeField::Total]);
        let text = now_playing_time_text(Duration::from_secs(5), None, &ui);
        assert_eq!(text.as_deref(), Some("00:05"));
        assert_eq!(now_playing_time_text(Duration::ZERO, None, &ui_with(vec![])), None);
    }

    #[test]
    fn status_shows_cover_art_size() {
        use std::sync::Arc;

        let mut app = App::new(Arc::new(Vec::new()), Meter::new(4, Duration::from_millis(600)));
        assert!(!status_text(&app, &UiSettings::default()).contains("Art:"));
        app.info.cover_art = Some(Arc::new(vec![0; 2048]));
        assert!(status_text(&app, &UiSettings::default()).contains("Art: 2 KiB"));
    }

    #[test]
    fn glyphs_span_the_level_range() {
        assert_eq!(level_glyph(0.0), '▁');
        assert_eq!(level_glyph(1.0), '█');
        assert_eq!(level_glyph(7.5), '█');
    }
}
