//! Turns one audio file into a catalog record

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use log::{debug, warn};

use crate::{
    art::{self, AlbumArtCache},
    domain::track::TrackMetadata,
    duration::resolve_from_reader,
    error::ExtractError,
    format::{self, probe_format},
    tags::{LoftyTagReader, TagReader, read_with_fallbacks},
};

/// Extracts metadata and album art from audio files.
///
/// Holds no per-file state: many threads may share one extractor, and
/// they only meet at the album art cache.
pub struct Extractor {
    cache: Arc<AlbumArtCache>,
    tag_reader: Box<dyn TagReader>,
}

impl Extractor {
    pub fn new(cache: Arc<AlbumArtCache>) -> Self {
        Self::with_tag_reader(cache, LoftyTagReader::new())
    }

    pub fn with_tag_reader<T: TagReader + 'static>(cache: Arc<AlbumArtCache>, tag_reader: T) -> Self {
        Self {
            cache,
            tag_reader: Box::new(tag_reader),
        }
    }

    pub fn cache(&self) -> &Arc<AlbumArtCache> {
        &self.cache
    }

    /// Builds the catalog record for `path`.
    ///
    /// Fails only when the file cannot be opened or stated. Unparseable
    /// duration or tags degrade to defaults instead.
    pub fn extract_from_file(&self, path: &Path, id: i64) -> Result<TrackMetadata, ExtractError> {
        let io_error = |source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let file_size_bytes = file.metadata().map_err(io_error)?.len();

        // size and duration come from the same handle
        let format = probe_format(path);
        let mut reader = BufReader::new(&file);
        let duration_seconds = match resolve_from_reader(&mut reader, file_size_bytes, format) {
            Ok(seconds) => seconds,
            Err(e) => {
                warn!("could not resolve duration of {}: {e}", path.display());
                0
            }
        };

        let tags = read_with_fallbacks(self.tag_reader.as_ref(), path);
        let art_id = tags.picture.as_deref().and_then(|picture| self.cache.put(picture));
        if tags.picture.is_some() && art_id.is_none() {
            debug!("album art of {} was not cached", path.display());
        }

        Ok(TrackMetadata {
            id,
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            track_number: tags.track_number,
            duration_seconds,
            file_path: path.to_string_lossy().into_owned(),
            file_size_bytes,
            has_album_art: art_id.is_some(),
            album_art_id: art_id.map(|id| id.to_hex()).unwrap_or_default(),
        })
    }

    /// Cached album art by hex ID.
    pub fn get_album_art(&self, art_id: &str) -> Option<Arc<[u8]>> {
        self.cache.get_hex(art_id)
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    format::is_supported(path)
}

pub fn content_type(path: &Path) -> String {
    format::content_type(path)
}

pub fn album_art_mime_type(bytes: &[u8]) -> &'static str {
    art::sniff_mime_type(bytes)
}
