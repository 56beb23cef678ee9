//! Audio metadata and duration extraction.
//!
//! Given a path to an MP3, FLAC, WAV or M4A file, [`Extractor`] produces a
//! [`TrackMetadata`] record: tags with sensible defaults, a duration parsed
//! straight from the container, and embedded cover art stored in a shared
//! content-addressed [`AlbumArtCache`].
//!
//! ```no_run
//! use std::{path::Path, sync::Arc};
//! use tagdeck::{AlbumArtCache, Extractor};
//!
//! let extractor = Extractor::new(Arc::new(AlbumArtCache::new()));
//! let track = extractor.extract_from_file(Path::new("music/track.flac"), 1)?;
//! println!("{} - {} ({}s)", track.artist, track.title, track.duration_seconds);
//! # Ok::<(), tagdeck::ExtractError>(())
//! ```

pub mod art;
pub mod config;
pub mod domain;
pub mod duration;
pub mod error;
pub mod extract;
pub mod format;
pub mod scan;
pub mod tags;

pub use art::{AlbumArtCache, sniff_mime_type};
pub use domain::{hash::ArtId, track::TrackMetadata};
pub use error::{DurationError, ExtractError, TagReadError};
pub use extract::{Extractor, album_art_mime_type, content_type, is_audio_file};
pub use format::AudioFormat;
pub use tags::{LoftyTagReader, RawTags, TagReader};
