use std::io::{Read, Seek, SeekFrom};

use super::{read_array, round_seconds, skip};
use crate::error::DurationError;

/// Size of the minimal canonical RIFF/WAVE header.
const CANONICAL_HEADER_LEN: u64 = 44;

#[derive(Debug, Clone, Copy)]
struct FormatChunk {
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

impl FormatChunk {
    fn parse(raw: &[u8; 16]) -> Self {
        Self {
            channels: u16::from_le_bytes([raw[2], raw[3]]),
            sample_rate: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            bits_per_sample: u16::from_le_bytes([raw[14], raw[15]]),
        }
    }

    fn bytes_per_sample_frame(&self) -> u64 {
        u64::from(self.bits_per_sample / 8) * u64::from(self.channels)
    }
}

/// Duration from the PCM payload size and the `fmt ` chunk.
///
/// Chunks are walked to find `fmt ` and `data`. A file without a `data`
/// chunk is assumed to carry PCM right after a canonical 44-byte header.
pub(super) fn duration<R: Read + Seek>(reader: &mut R, len: u64) -> Result<u64, DurationError> {
    reader.seek(SeekFrom::Start(0))?;
    if len < 12 {
        return Err(DurationError::InvalidHeader("file too short for RIFF header"));
    }
    let riff: [u8; 12] = read_array(reader)?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(DurationError::InvalidHeader("not a RIFF/WAVE file"));
    }

    let mut format = None;
    let mut pcm_bytes = None;
    let mut pos = 12;

    while len - pos >= 8 {
        let header: [u8; 8] = read_array(reader)?;
        pos += 8;
        let size = u64::from(u32::from_le_bytes([header[4], header[5], header[6], header[7]]));
        let available = len - pos;

        match &header[0..4] {
            b"fmt " => {
                if size < 16 || size > available {
                    return Err(DurationError::MalformedBox {
                        kind: "WAV fmt chunk".to_string(),
                        size,
                    });
                }
                let raw: [u8; 16] = read_array(reader)?;
                format = Some(FormatChunk::parse(&raw));
                skip(reader, size - 16)?;
            }
            b"data" => {
                // streamed writers leave the size at 0xFFFFFFFF
                pcm_bytes = Some(size.min(available));
                break;
            }
            _ => {
                if size > available {
                    break;
                }
                skip(reader, size)?;
            }
        }
        pos += size;

        // chunks are word aligned
        if size % 2 == 1 && pos < len {
            skip(reader, 1)?;
            pos += 1;
        }
    }

    let format = format.ok_or(DurationError::InvalidHeader("missing fmt chunk"))?;
    let pcm_bytes = pcm_bytes.unwrap_or_else(|| len.saturating_sub(CANONICAL_HEADER_LEN));

    let frame_size = format.bytes_per_sample_frame();
    if frame_size == 0 {
        return Err(DurationError::ZeroField("bytes per sample frame"));
    }
    if format.sample_rate == 0 {
        return Err(DurationError::ZeroField("sample rate"));
    }

    let sample_frames = pcm_bytes / frame_size;
    Ok(round_seconds(sample_frames, u64::from(format.sample_rate)))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use super::*;

    fn fmt_chunk(sample_rate: u32, bits: u16, channels: u16) -> Vec<u8> {
        let block_align = bits / 8 * channels;
        let mut chunk = b"fmt ".to_vec();
        chunk.extend_from_slice(&16u32.to_le_bytes());
        chunk.extend_from_slice(&1u16.to_le_bytes()); // PCM
        chunk.extend_from_slice(&channels.to_le_bytes());
        chunk.extend_from_slice(&sample_rate.to_le_bytes());
        chunk.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
        chunk.extend_from_slice(&block_align.to_le_bytes());
        chunk.extend_from_slice(&bits.to_le_bytes());
        chunk
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend(body);
        bytes
    }

    fn data_chunk(pcm_len: usize) -> Vec<u8> {
        let mut chunk = b"data".to_vec();
        chunk.extend_from_slice(&(pcm_len as u32).to_le_bytes());
        chunk.extend(std::iter::repeat_n(0u8, pcm_len));
        chunk
    }

    /// Canonical 44-byte header followed by `pcm_len` bytes of silence.
    pub(crate) fn wav_bytes(sample_rate: u32, bits: u16, channels: u16, pcm_len: usize) -> Vec<u8> {
        riff(&[fmt_chunk(sample_rate, bits, channels), data_chunk(pcm_len)])
    }

    fn resolve(bytes: Vec<u8>) -> Result<u64, DurationError> {
        let len = bytes.len() as u64;
        duration(&mut Cursor::new(bytes), len)
    }

    #[test]
    fn canonical_header_is_44_bytes() {
        let bytes = wav_bytes(44_100, 16, 2, 0);
        assert_eq!(bytes.len() as u64, CANONICAL_HEADER_LEN);
    }

    #[test]
    fn eight_seconds_of_cd_audio() {
        // 1 411 200 / 4 = 352 800 sample frames
        assert_eq!(resolve(wav_bytes(44_100, 16, 2, 1_411_200)).unwrap(), 8);
    }

    #[test]
    fn metadata_chunks_before_data_are_not_counted() {
        let mut list = b"LIST".to_vec();
        list.extend_from_slice(&(44_101u32).to_le_bytes());
        list.extend(std::iter::repeat_n(b'x', 44_101 + 1));

        let bytes = riff(&[fmt_chunk(8_000, 8, 1), list, data_chunk(20_000)]);
        // 20 000 frames at 8 kHz = 2.5s, rounded up
        assert_eq!(resolve(bytes).unwrap(), 3);
    }

    #[test]
    fn data_size_is_clamped_to_file() {
        let mut bytes = wav_bytes(44_100, 16, 2, 176_400);
        // streamed header with unknown size
        bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(resolve(bytes).unwrap(), 1);
    }

    #[test]
    fn missing_data_chunk_assumes_canonical_header() {
        let mut bytes = riff(&[fmt_chunk(44_100, 16, 2)]);
        // 36 bytes of header so far; pad to 44 then add 4 seconds of PCM
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend(std::iter::repeat_n(0u8, 705_600));
        // the trailing zeros parse as an empty chunk with id "\0\0\0\0"
        assert_eq!(resolve(bytes).unwrap(), 4);
    }

    #[test]
    fn rejects_non_riff() {
        let err = resolve(b"ID3 this is not a wave file at all".to_vec()).unwrap_err();
        assert!(matches!(err, DurationError::InvalidHeader(_)));
        let err = resolve(b"RIFF".to_vec()).unwrap_err();
        assert!(matches!(err, DurationError::InvalidHeader(_)));
    }

    #[test]
    fn zero_channels_fails() {
        let err = resolve(wav_bytes(44_100, 16, 0, 1000)).unwrap_err();
        assert!(matches!(err, DurationError::ZeroField("bytes per sample frame")));
    }

    #[test]
    fn zero_sample_rate_fails() {
        let err = resolve(wav_bytes(0, 16, 2, 1000)).unwrap_err();
        assert!(matches!(err, DurationError::ZeroField("sample rate")));
    }

    #[test]
    fn missing_fmt_chunk_fails() {
        let err = resolve(riff(&[data_chunk(1000)])).unwrap_err();
        assert!(matches!(err, DurationError::InvalidHeader("missing fmt chunk")));
    }
}
