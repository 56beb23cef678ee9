use serde::Serialize;

/// Catalog record produced for a single audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackMetadata {
    /// Caller-supplied catalog ID, passed through untouched
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// 0 when unknown
    pub track_number: u32,
    /// 0 when unknown or unresolvable
    pub duration_seconds: u64,
    pub file_path: String,
    pub file_size_bytes: u64,
    pub has_album_art: bool,
    /// Hex art ID, empty when the track has no album art
    pub album_art_id: String,
}
