//! Content-addressed store for embedded album art

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use log::{debug, warn};

use crate::domain::hash::ArtId;

/// MIME type of an image, guessed from its magic bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.len() < 4 {
        return "application/octet-stream";
    }
    match bytes {
        [0xFF, 0xD8, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x47, 0x49, 0x46, ..] => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Default)]
struct Entries {
    images: HashMap<ArtId, Arc<[u8]>>,
    total_bytes: u64,
}

/// Album art shared by every concurrent extraction.
///
/// Images are keyed by the hash of their bytes, so the same cover embedded
/// in many files is stored once. Entries are never evicted. With a byte
/// budget set, new images that would exceed it are refused instead.
#[derive(Debug, Default)]
pub struct AlbumArtCache {
    entries: RwLock<Entries>,
    max_bytes: Option<u64>,
}

impl AlbumArtCache {
    /// Unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            entries: RwLock::default(),
            max_bytes: Some(max_bytes),
        }
    }

    /// Stores `bytes` and returns their ID.
    ///
    /// Storing identical bytes again returns the same ID. Returns `None`
    /// only when a new image does not fit in the byte budget.
    pub fn put(&self, bytes: &[u8]) -> Option<ArtId> {
        let id = ArtId::from_bytes(bytes);
        // writers only ever do a single insert, so a poisoned map is still consistent
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.images.contains_key(&id) {
            debug!("album art {id} already cached");
            return Some(id);
        }

        let size = bytes.len() as u64;
        if let Some(max) = self.max_bytes {
            if entries.total_bytes + size > max {
                warn!(
                    "album art cache full ({} of {max} bytes used), dropping {size} byte image {id}",
                    entries.total_bytes
                );
                return None;
            }
        }

        entries.images.insert(id, Arc::from(bytes));
        entries.total_bytes += size;
        debug!("cached album art {id} ({size} bytes)");
        Some(id)
    }

    pub fn get(&self, id: &ArtId) -> Option<Arc<[u8]>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.images.get(id).cloned()
    }

    /// Looks up an image by its hex ID. Malformed IDs are simply not found.
    pub fn get_hex(&self, hex: &str) -> Option<Arc<[u8]>> {
        let id = ArtId::from_hex(hex).ok()?;
        self.get(&id)
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(sniff_mime_type(JPEG), "image/jpeg");
        assert_eq!(sniff_mime_type(PNG), "image/png");
        assert_eq!(sniff_mime_type(b"GIF89a"), "image/gif");
    }

    #[test]
    fn sniffs_unknown_and_short_input_as_octet_stream() {
        assert_eq!(sniff_mime_type(b"RIFF"), "application/octet-stream");
        assert_eq!(sniff_mime_type(&[0xFF, 0xD8]), "application/octet-stream");
        assert_eq!(sniff_mime_type(b"GIF"), "application/octet-stream");
        assert_eq!(sniff_mime_type(&[]), "application/octet-stream");
    }

    #[test]
    fn put_is_idempotent() {
        let cache = AlbumArtCache::new();

        let first = cache.put(JPEG).unwrap();
        let second = cache.put(JPEG).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), JPEG.len() as u64);
        assert_eq!(cache.get(&first).as_deref(), Some(JPEG));
    }

    #[test]
    fn distinct_images_get_distinct_ids() {
        let cache = AlbumArtCache::new();
        let jpeg = cache.put(JPEG).unwrap();
        let png = cache.put(PNG).unwrap();

        assert_ne!(jpeg, png);
        assert_eq!(cache.get(&png).as_deref(), Some(PNG));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn lookup_by_hex() {
        let cache = AlbumArtCache::new();
        let id = cache.put(PNG).unwrap();

        assert_eq!(cache.get_hex(&id.to_hex()).as_deref(), Some(PNG));
        assert!(cache.get_hex("zz").is_none());
        assert!(cache.get_hex(&ArtId::from_bytes(b"never stored").to_hex()).is_none());
    }

    #[test]
    fn byte_budget_refuses_new_images_but_keeps_existing() {
        let cache = AlbumArtCache::with_max_bytes(12);

        let jpeg = cache.put(JPEG).unwrap();
        assert!(cache.put(PNG).is_none());
        assert_eq!(cache.put(JPEG), Some(jpeg));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&ArtId::from_bytes(PNG)).is_none());
    }

    #[test]
    fn concurrent_writers_and_readers_keep_every_entry() {
        let cache = Arc::new(AlbumArtCache::new());
        let writers = 8;
        let per_writer = 200;

        thread::scope(|s| {
            for w in 0..writers {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..per_writer {
                        // every writer also stores one image shared with all the others
                        let shared = format!("shared-{i}");
                        let own = format!("writer-{w}-image-{i}");

                        let shared_id = cache.put(shared.as_bytes()).unwrap();
                        let own_id = cache.put(own.as_bytes()).unwrap();

                        assert_eq!(cache.get(&shared_id).as_deref(), Some(shared.as_bytes()));
                        assert_eq!(cache.get(&own_id).as_deref(), Some(own.as_bytes()));
                    }
                });
            }
        });

        assert_eq!(cache.len(), writers * per_writer + per_writer);
        for w in 0..writers {
            for i in 0..per_writer {
                let own = format!("writer-{w}-image-{i}");
                let id = ArtId::from_bytes(own.as_bytes());
                assert_eq!(cache.get(&id).as_deref(), Some(own.as_bytes()));
            }
        }
    }
}
