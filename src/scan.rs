//! Module to scan music directories and extract every track found

use walkdir::WalkDir;

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use log::warn;

use crate::{
    config::ScanConfig, domain::track::TrackMetadata, error::ExtractError, extract::Extractor,
    format::is_supported,
};

/// Recursively finds all supported audio files under `root`, sorted by path.
pub fn discover(config: &ScanConfig, root: &Path) -> Vec<PathBuf> {
    let root_str = root.to_string_lossy();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);

    let mut paths = walker
        .into_iter()
        // filter out ignored directories
        .filter_entry(|entry| {
            let entry_path = entry.path();
            !config
                .ignored_dirs
                .iter()
                .any(|ignored| entry_path.starts_with(ignored))
        })
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("error while scanning dir {root_str}, skipping an entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| is_supported(path))
        .collect::<Vec<PathBuf>>();

    paths.sort();
    paths
}

#[derive(Debug)]
pub struct ScanResult {
    pub path: PathBuf,
    pub result: Result<TrackMetadata, ExtractError>,
}

/// Extracts every path on `workers` threads sharing `extractor`.
///
/// Track IDs are 1-based positions in `paths`; results come back in the same order.
pub fn extract_all(extractor: &Extractor, paths: &[PathBuf], workers: usize) -> Vec<ScanResult> {
    let next = &AtomicUsize::new(0);
    let workers = workers.clamp(1, paths.len().max(1));

    let mut done: Vec<(usize, ScanResult)> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = paths.get(i) else {
                            break;
                        };
                        let result = extractor.extract_from_file(path, i as i64 + 1);
                        done.push((
                            i,
                            ScanResult {
                                path: path.clone(),
                                result,
                            },
                        ));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(done) => done,
                Err(_) => {
                    warn!("extraction worker panicked, its results are lost");
                    Vec::new()
                }
            })
            .collect()
    });

    done.sort_by_key(|(i, _)| *i);
    done.into_iter().map(|(_, result)| result).collect()
}
