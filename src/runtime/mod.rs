use std::env;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::{App, Meter};
use crate::audio::AudioPlayer;
use crate::library::scan;

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let mut settings = settings::load_settings();

    let arg = env::args().nth(1);
    let source = startup::resolve_source(
        arg.as_deref(),
        &settings.session,
        env::current_dir().ok(),
    );

    let tracks = match source.as_ref().and_then(|s| s.folder()) {
        Some(dir) => {
            settings.session.set_last_folder(dir);
            scan(dir, &settings.library)
        }
        None => Vec::new(),
    };
    info!(source = ?source, tracks = tracks.len(), "starting");

    // No output device is fatal: report it before touching the terminal.
    let audio_player = AudioPlayer::new(tracks, &settings)?;
    let handle = audio_player.handle();

    let meter = Meter::new(
        settings.ui.meter_bars,
        Duration::from_millis(settings.ui.peak_hold_ms),
    );
    let mut app = App::new(handle.tracks(), meter);
    app.follow_playback = settings.ui.follow_playback;
    if let Some(source) = &source {
        if !matches!(source, startup::Source::Radio(_)) {
            app.set_current_dir(source.label());
        }
        startup::apply_source(source, &audio_player);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::new(settings.session.clone());
    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &audio_player, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
