//! Plain-text playlists: one path per line, `#` lines are comments.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::PlayerError;

/// Parse playlist `text`, resolving relative entries against `base_dir`.
pub fn parse(text: &str, base_dir: &Path) -> Vec<PathBuf> {
    text.lines()
        .map(|l| l.trim().trim_start_matches('\u{feff}'))
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            let p = PathBuf::from(l);
            if p.is_absolute() { p } else { base_dir.join(p) }
        })
        .collect()
}

/// Render `paths` with an `#EXTM3U` header.
pub fn render(paths: &[PathBuf]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for p in paths {
        out.push_str(&p.to_string_lossy());
        out.push('\n');
    }
    out
}

pub fn read(path: &Path) -> Result<Vec<PathBuf>, PlayerError> {
    let text = fs::read_to_string(path)
        .map_err(|e| PlayerError::Playlist(format!("{}: {e}", path.display())))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(parse(&text, base))
}

pub fn write(path: &Path, paths: &[PathBuf]) -> Result<(), PlayerError> {
    fs::write(path, render(paths))
        .map_err(|e| PlayerError::Playlist(format!("{}: {e}", path.display())))
}
