//! Maps file extensions to the audio formats this crate can parse

use std::path::Path;

/// Container format detected from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Wav,
    M4a,
    Unsupported,
}

const FORMATS: &[(&str, AudioFormat, &str)] = &[
    ("mp3", AudioFormat::Mp3, "audio/mpeg"),
    ("flac", AudioFormat::Flac, "audio/flac"),
    ("wav", AudioFormat::Wav, "audio/wav"),
    ("m4a", AudioFormat::M4a, "audio/mp4"),
];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn lookup(path: &Path) -> Option<(AudioFormat, &'static str)> {
    let ext = lowercase_extension(path)?;
    FORMATS
        .iter()
        .find(|(known, _, _)| *known == ext)
        .map(|(_, format, mime)| (*format, *mime))
}

pub fn probe_format(path: &Path) -> AudioFormat {
    lookup(path)
        .map(|(format, _)| format)
        .unwrap_or(AudioFormat::Unsupported)
}

pub fn is_supported(path: &Path) -> bool {
    probe_format(path) != AudioFormat::Unsupported
}

/// MIME type for streaming headers.
///
/// Supported formats come from the fixed table; anything else is guessed
/// from the extension and ends up as `application/octet-stream` when unknown.
pub fn content_type(path: &Path) -> String {
    match lookup(path) {
        Some((_, mime)) => mime.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
    }
}
