use std::path::PathBuf;

use thiserror::Error;

/// The only failure `Extractor::extract_from_file` reports to callers.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Duration could not be resolved. Absorbed by the extractor.
#[derive(Debug, Error)]
pub enum DurationError {
    #[error("unsupported audio format")]
    UnsupportedFormat,

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("'{0}' box not found")]
    BoxNotFound(&'static str),

    #[error("STREAMINFO block not found")]
    MissingStreamInfo,

    #[error("{0} is zero")]
    ZeroField(&'static str),

    #[error("malformed {kind} of {size} bytes")]
    MalformedBox { kind: String, size: u64 },
}

/// Embedded tags could not be read. Absorbed by the extractor.
#[derive(Debug, Error)]
pub enum TagReadError {
    #[error("tag error: {0}")]
    Lofty(#[from] lofty::error::LoftyError),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
