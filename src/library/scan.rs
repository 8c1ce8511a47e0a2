use std::path::Path;

use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::format::is_audio_path;
use super::model::Track;
use super::tags::read_tags;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Build a `Track` for `path`, filling metadata from tags when they can be read.
pub fn read_track(path: &Path, settings: &LibrarySettings) -> Track {
    let mut track = Track::bare(path.to_path_buf());

    match read_tags(path) {
        Ok(tags) => {
            if let Some(title) = tags.title {
                track.title = title;
            }
            track.artist = tags.artist;
            track.album = tags.album;
            track.year = tags.year;
            track.duration = tags.duration;
        }
        Err(e) => tracing::debug!("no tags for {}: {e}", path.display()),
    }

    track.display = display_from_fields(
        path,
        &track.title,
        track.artist.as_deref(),
        track.album.as_deref(),
        track.year,
        &settings.display_fields,
        &settings.display_separator,
    );
    track
}

/// Enumerate audio files under `dir`, sorted by display string (case-insensitive).
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_path(path, &settings.extensions)
        {
            tracks.push(read_track(path, settings));
        }
    }

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
    tracing::info!("scanned {} tracks under {}", tracks.len(), dir.display());
    tracks
}
