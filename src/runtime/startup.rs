use std::path::{Path, PathBuf};

use crate::audio::{AudioCmd, AudioPlayer};
use crate::config::SessionSettings;

/// What the player was asked to open on launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Folder(PathBuf),
    Playlist(PathBuf),
    File(PathBuf),
    Radio(String),
}

impl Source {
    /// Folder whose contents seed the initial playlist, if any.
    pub fn folder(&self) -> Option<&Path> {
        match self {
            Source::Folder(d) => Some(d),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Source::Folder(p) | Source::Playlist(p) | Source::File(p) => p.display().to_string(),
            Source::Radio(url) => url.clone(),
        }
    }
}

pub fn is_radio_url(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn is_playlist_path(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("m3u") || e.eq_ignore_ascii_case("m3u8"))
        .unwrap_or(false)
}

/// Pick the launch source: the command-line argument, else the last folder
/// remembered in the session, else `cwd`.
pub fn resolve_source(
    arg: Option<&str>,
    session: &SessionSettings,
    cwd: Option<PathBuf>,
) -> Option<Source> {
    if let Some(arg) = arg.map(str::trim).filter(|a| !a.is_empty()) {
        if is_radio_url(arg) {
            return Some(Source::Radio(arg.to_string()));
        }
        let path = PathBuf::from(arg);
        if is_playlist_path(&path) {
            return Some(Source::Playlist(path));
        }
        if path.is_file() {
            return Some(Source::File(path));
        }
        return Some(Source::Folder(path));
    }

    session
        .last_folder()
        .filter(|d| d.is_dir())
        .map(Path::to_path_buf)
        .or(cwd)
        .map(Source::Folder)
}

/// Queue whatever the engine still has to do for `source`. Folders are
/// scanned up front and handed to the player directly.
pub fn apply_source(source: &Source, audio_player: &AudioPlayer) {
    let cmd = match source {
        Source::Folder(_) => return,
        Source::Playlist(p) => AudioCmd::ImportPlaylist(p.clone()),
        Source::File(p) => AudioCmd::OpenFile(p.clone()),
        Source::Radio(url) => AudioCmd::PlayRadio(url.clone()),
    };
    let _ = audio_player.send(cmd);
}
