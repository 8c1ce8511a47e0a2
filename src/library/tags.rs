//! Read-only tag access plus the one write the player performs: embedding
//! cover art on request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::config::WriteOptions;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::*;
use lofty::tag::Tag;

use crate::audio::PlayerError;

use super::model::Track;

#[derive(Debug, Default, Clone)]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub duration: Option<Duration>,
    pub embedded_art: Option<Vec<u8>>,
}

fn non_empty(v: Option<impl AsRef<str>>) -> Option<String> {
    v.map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Leading four digits of a date-ish tag value ("1997", "1997-05-21").
fn parse_year(raw: &str) -> Option<u32> {
    let digits: String = raw.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn map_err(path: &Path, e: impl ToString) -> PlayerError {
    PlayerError::Metadata {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Read `{title, artist, album, year, duration, embedded_art}` from `path`.
pub fn read_tags(path: &Path) -> Result<TagInfo, PlayerError> {
    let tagged = lofty::read_from_path(path).map_err(|e| map_err(path, e))?;

    let mut info = TagInfo {
        duration: Some(tagged.properties().duration()).filter(|d| !d.is_zero()),
        ..TagInfo::default()
    };

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Ok(info);
    };

    info.title = non_empty(tag.title());
    info.artist = non_empty(tag.artist());
    info.album = non_empty(tag.album());
    info.year = tag
        .items()
        .filter(|item| matches!(item.key(), ItemKey::Year | ItemKey::RecordingDate))
        .filter_map(|item| item.value().text())
        .find_map(parse_year);
    info.embedded_art = front_cover(tag.pictures());

    Ok(info)
}

fn front_cover(pictures: &[Picture]) -> Option<Vec<u8>> {
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .map(|p| p.data().to_vec())
}

/// Embed `image` as the front cover of `path`, replacing any existing one.
pub fn embed_art(path: &Path, image: &[u8]) -> Result<(), PlayerError> {
    let mut tagged = lofty::read_from_path(path).map_err(|e| map_err(path, e))?;

    let mut picture = Picture::from_reader(&mut &image[..]).map_err(|e| map_err(path, e))?;
    picture.set_pic_type(PictureType::CoverFront);

    if tagged.primary_tag().is_none() {
        let tag_type = tagged.primary_tag_type();
        tagged.insert_tag(Tag::new(tag_type));
    }
    let Some(tag) = tagged.primary_tag_mut() else {
        return Err(map_err(path, "file format does not accept tags"));
    };
    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(picture);

    tagged
        .save_to_path(path, WriteOptions::default())
        .map_err(|e| map_err(path, e))?;
    tracing::info!(path = %path.display(), "embedded cover art");
    Ok(())
}

const COVER_STEMS: [&str; 4] = ["cover", "folder", "front", "album"];
const COVER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn cover_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !COVER_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?.to_ascii_lowercase();
    COVER_STEMS.iter().position(|s| *s == stem)
}

/// The conventional cover image kept next to the audio in `dir`
/// (`cover.jpg`, `Folder.png`, ...), preferring "cover" over the others.
pub fn find_folder_cover(dir: &Path) -> Option<PathBuf> {
    let mut found: Vec<(usize, PathBuf)> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter_map(|p| cover_rank(&p).map(|rank| (rank, p)))
        .collect();
    found.sort();
    found.into_iter().next().map(|(_, p)| p)
}

/// Cover art provider consumed by the presentation layer.
pub trait CoverArtSource: Send + Sync {
    fn cover_art(&self, track: &Track) -> Option<Vec<u8>>;
}

/// Serves the picture stored in the file's own tags.
pub struct EmbeddedArt;

impl CoverArtSource for EmbeddedArt {
    fn cover_art(&self, track: &Track) -> Option<Vec<u8>> {
        read_tags(&track.path).ok().and_then(|t| t.embedded_art)
    }
}
