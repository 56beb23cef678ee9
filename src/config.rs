use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::art::AlbumArtCache;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub art_cache: ArtCacheConfig,
    pub scan: ScanConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ArtCacheConfig {
    /// Byte budget for cached images; unbounded when absent
    pub max_bytes: Option<u64>,
}

impl ArtCacheConfig {
    pub fn build(&self) -> AlbumArtCache {
        match self.max_bytes {
            Some(max) => AlbumArtCache::with_max_bytes(max),
            None => AlbumArtCache::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// 0 means one worker per available core
    pub workers: usize,
    pub follow_symlinks: bool,
    pub ignored_dirs: Vec<PathBuf>,
}

impl ScanConfig {
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}
