use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use super::format::{Format, classify};

#[derive(Clone, Debug)]
pub struct Track {
    pub path: PathBuf,
    pub format: Format,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub duration: Option<Duration>,
    pub display: String,
}

impl Track {
    /// A track with no tag information: title and display fall back to the file stem.
    pub fn bare(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        Self {
            format: classify(&path),
            display: title.clone(),
            title,
            path,
            artist: None,
            album: None,
            year: None,
            duration: None,
        }
    }

    /// Identity used to key cached PCM snapshots. Changes when the file on
    /// disk is rewritten.
    pub fn key(&self) -> TrackKey {
        let meta = std::fs::metadata(&self.path).ok();
        TrackKey {
            path: self.path.clone(),
            len: meta.as_ref().map(|m| m.len()),
            modified: meta.and_then(|m| m.modified().ok()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub path: PathBuf,
    pub len: Option<u64>,
    pub modified: Option<SystemTime>,
}
