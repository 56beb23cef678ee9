//! Embedded tag reading and the defaults used when tags are missing

use std::path::Path;

use log::debug;
use lofty::{picture::PictureType, prelude::*, probe::Probe};

use crate::error::TagReadError;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
const UNKNOWN_TITLE: &str = "Unknown Title";

/// Tags exactly as found in the file. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    pub picture: Option<Vec<u8>>,
}

/// Reads embedded tags from an audio file.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<RawTags, TagReadError>;
}

/// Tag reader backed by lofty (ID3v2, Vorbis comments, MP4 ilst, RIFF INFO)
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<RawTags, TagReadError> {
        let tagged = Probe::open(path)?.read()?;

        let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
            return Ok(RawTags::default());
        };

        // prefer the front cover, fall back to whatever comes first
        let pictures = tag.pictures();
        let picture = pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first())
            .map(|p| p.data().to_vec());

        Ok(RawTags {
            title: tag.title().map(|s| s.to_string()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            track_number: tag.track(),
            picture,
        })
    }
}

/// Tags with every catalog field filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// 0 when unknown
    pub track_number: u32,
    pub picture: Option<Vec<u8>>,
}

impl TrackTags {
    /// Record used when the file's tags cannot be read at all.
    pub fn fallback(path: &Path) -> Self {
        Self {
            title: title_from_path(path),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            track_number: 0,
            picture: None,
        }
    }

    /// Keeps the fields present in `raw` and defaults the rest.
    pub fn from_raw(raw: RawTags, path: &Path) -> Self {
        let title = non_blank(raw.title).unwrap_or_else(|| title_from_path(path));
        let artist = non_blank(raw.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let album = non_blank(raw.album).unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        Self {
            title,
            artist,
            album,
            track_number: raw.track_number.unwrap_or(0),
            picture: raw.picture.filter(|p| !p.is_empty()),
        }
    }
}

/// Reads tags through `reader`, never failing: errors become the fallback record.
pub fn read_with_fallbacks(reader: &dyn TagReader, path: &Path) -> TrackTags {
    match reader.read_tags(path) {
        Ok(raw) => TrackTags::from_raw(raw, path),
        Err(e) => {
            debug!(
                "could not read tags from {}, using defaults: {e}",
                path.display()
            );
            TrackTags::fallback(path)
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}
