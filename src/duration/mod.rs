//! Duration resolvers, one per supported container format.
//!
//! Every resolver reads only the headers it needs. Box, chunk and block
//! walkers check each declared size against the bytes actually left in
//! the file and always move forward, so crafted sizes cannot loop or
//! seek past the end.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use crate::{error::DurationError, format::AudioFormat};

pub(crate) mod flac;
pub(crate) mod mp3;
pub(crate) mod mp4;
pub(crate) mod wav;

/// Resolves the playback duration of the file at `path`, in whole seconds.
pub fn resolve_duration(path: &Path, format: AudioFormat) -> Result<u64, DurationError> {
    if format == AudioFormat::Unsupported {
        return Err(DurationError::UnsupportedFormat);
    }
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    resolve_from_reader(&mut reader, len, format)
}

/// Same as [`resolve_duration`], over any seekable byte source of `len` bytes.
pub fn resolve_from_reader<R: Read + Seek>(
    reader: &mut R,
    len: u64,
    format: AudioFormat,
) -> Result<u64, DurationError> {
    match format {
        AudioFormat::Mp3 => mp3::duration(reader, len),
        AudioFormat::Flac => flac::duration(reader, len),
        AudioFormat::Wav => wav::duration(reader, len),
        AudioFormat::M4a => mp4::duration(reader, len),
        AudioFormat::Unsupported => Err(DurationError::UnsupportedFormat),
    }
}

/// `units / rate` rounded to the nearest second.
fn round_seconds(units: u64, rate: u64) -> u64 {
    (units as f64 / rate as f64 + 0.5) as u64
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> std::io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn skip<R: Seek>(reader: &mut R, n: u64) -> std::io::Result<()> {
    reader.seek(SeekFrom::Current(n as i64))?;
    Ok(())
}

/// Positions `reader` right after a leading ID3v2 tag, if there is one,
/// and returns that offset.
fn skip_id3v2<R: Read + Seek>(reader: &mut R, len: u64) -> std::io::Result<u64> {
    reader.seek(SeekFrom::Start(0))?;
    if len < 10 {
        return Ok(0);
    }

    let header: [u8; 10] = read_array(reader)?;
    if &header[0..3] != b"ID3" {
        reader.seek(SeekFrom::Start(0))?;
        return Ok(0);
    }

    // synchsafe: 7 significant bits per byte
    let size = header[6..10]
        .iter()
        .fold(0u64, |acc, b| (acc << 7) | u64::from(b & 0x7F));
    let footer = if header[5] & 0x10 != 0 { 10 } else { 0 };
    let end = (10 + size + footer).min(len);

    reader.seek(SeekFrom::Start(end))?;
    Ok(end)
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn rounds_to_nearest_second() {
        assert_eq!(round_seconds(44100 * 2, 44100), 2);
        assert_eq!(round_seconds(44100 * 2 + 22050, 44100), 3);
        assert_eq!(round_seconds(44100 * 2 + 22049, 44100), 2);
        assert_eq!(round_seconds(0, 44100), 0);
    }

    #[test]
    fn id3v2_tag_is_skipped() -> anyhow::Result<()> {
        let mut bytes = testutil::id3v2_tag(300);
        bytes.extend_from_slice(b"fLaC");
        let len = bytes.len() as u64;
        let mut reader = Cursor::new(bytes);

        let offset = skip_id3v2(&mut reader, len)?;
        assert_eq!(offset, 310);

        let marker: [u8; 4] = read_array(&mut reader)?;
        assert_eq!(&marker, b"fLaC");
        Ok(())
    }

    #[test]
    fn no_id3v2_tag_rewinds() -> anyhow::Result<()> {
        let bytes = b"RIFF0000WAVE".to_vec();
        let mut reader = Cursor::new(bytes);
        assert_eq!(skip_id3v2(&mut reader, 12)?, 0);
        assert_eq!(reader.position(), 0);
        Ok(())
    }

    #[test]
    fn id3v2_size_past_end_is_clamped() -> anyhow::Result<()> {
        let mut bytes = testutil::id3v2_tag(0);
        // claim a body far larger than the file
        bytes[6..10].copy_from_slice(&[0x7F, 0x7F, 0x7F, 0x7F]);
        let len = bytes.len() as u64;
        let mut reader = Cursor::new(bytes);
        assert_eq!(skip_id3v2(&mut reader, len)?, len);
        Ok(())
    }

    #[test]
    fn unsupported_format_is_an_error() {
        let mut reader = Cursor::new(vec![0u8; 64]);
        let err = resolve_from_reader(&mut reader, 64, AudioFormat::Unsupported).unwrap_err();
        assert!(matches!(err, DurationError::UnsupportedFormat));
    }

    #[test]
    fn resolve_duration_reads_from_disk() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tone.flac");
        std::fs::write(&path, flac::tests::flac_bytes(5_292_000, 44_100))?;

        assert_eq!(resolve_duration(&path, AudioFormat::Flac)?, 120);
        Ok(())
    }

    #[test]
    fn resolve_duration_missing_file_is_io_error() {
        let err = resolve_duration(Path::new("/nonexistent/tone.flac"), AudioFormat::Flac)
            .unwrap_err();
        assert!(matches!(err, DurationError::Io(_)));
    }
}
