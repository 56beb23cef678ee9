use std::io::{self, Read, Seek, SeekFrom};

use log::debug;

use super::{read_array, skip_id3v2};
use crate::error::DurationError;

/// Bitrate used to estimate duration when no frame could be decoded.
const ASSUMED_BITRATE: u64 = 192_000;

const ID3V1_MARKER: &[u8] = b"TAG";

// kbps, indexed by the 4-bit bitrate field
const V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const MPEG1_SAMPLE_RATES: [u32; 3] = [44_100, 48_000, 32_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    I,
    II,
    III,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameHeader {
    sample_rate: u32,
    samples: u32,
    /// whole frame, header included
    length: u64,
}

impl FrameHeader {
    fn parse(h: [u8; 4]) -> Option<Self> {
        if h[0] != 0xFF || h[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (h[1] >> 3) & 0b11 {
            0 => Version::Mpeg25,
            2 => Version::Mpeg2,
            3 => Version::Mpeg1,
            _ => return None,
        };
        let layer = match (h[1] >> 1) & 0b11 {
            1 => Layer::III,
            2 => Layer::II,
            3 => Layer::I,
            _ => return None,
        };

        // 0 is free format, 15 is invalid
        let bitrate_index = usize::from(h[2] >> 4);
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let sample_rate_index = usize::from((h[2] >> 2) & 0b11);
        if sample_rate_index == 3 {
            return None;
        }
        let padding = u64::from((h[2] >> 1) & 1);

        let kbps = match (version, layer) {
            (Version::Mpeg1, Layer::I) => V1_L1,
            (Version::Mpeg1, Layer::II) => V1_L2,
            (Version::Mpeg1, Layer::III) => V1_L3,
            (_, Layer::I) => V2_L1,
            (_, _) => V2_L23,
        }[bitrate_index];

        let sample_rate = MPEG1_SAMPLE_RATES[sample_rate_index]
            / match version {
                Version::Mpeg1 => 1,
                Version::Mpeg2 => 2,
                Version::Mpeg25 => 4,
            };

        let samples = match (version, layer) {
            (_, Layer::I) => 384,
            (_, Layer::II) | (Version::Mpeg1, Layer::III) => 1152,
            (_, Layer::III) => 576,
        };

        let bitrate = u64::from(kbps) * 1000;
        let rate = u64::from(sample_rate);
        let length = match layer {
            // Layer I slots are 4 bytes
            Layer::I => (12 * bitrate / rate + padding) * 4,
            _ => u64::from(samples / 8) * bitrate / rate + padding,
        };
        if length <= 4 {
            return None;
        }

        Some(Self {
            sample_rate,
            samples,
            length,
        })
    }

    fn seconds(&self) -> f64 {
        f64::from(self.samples) / f64::from(self.sample_rate)
    }
}

#[derive(Debug, Default)]
struct FrameScan {
    frames: u64,
    seconds: f64,
    /// the audio data opens with a frame header
    leading_header: bool,
}

/// Sums frame durations; falls back to a bitrate estimate when nothing decodes.
///
/// The estimate only applies to data that presents itself as MPEG audio, through
/// a leading ID3v2 tag or a frame header right where the audio starts. Anything
/// else is not an MP3 stream and is an error.
pub(super) fn duration<R: Read + Seek>(reader: &mut R, len: u64) -> Result<u64, DurationError> {
    let start = skip_id3v2(reader, len)?;
    let scan = scan_frames(reader, start, len);

    if scan.frames > 0 {
        return Ok(scan.seconds as u64);
    }
    if start == 0 && !scan.leading_header {
        return Err(DurationError::InvalidHeader("no MPEG frame sync found"));
    }
    debug!("no MPEG frames decoded, estimating from {len} bytes at {ASSUMED_BITRATE} bps");
    Ok(len * 8 / ASSUMED_BITRATE)
}

/// Walks frames from offset `start` to `len`, with `reader` positioned at `start`.
///
/// A header is trusted once the frame it describes is followed by another
/// header, an ID3v1 trailer or the end of the data. Lookalike headers in junk
/// fail that check and the walk resumes one byte past them. A read error ends
/// the walk and keeps whatever was accumulated so far.
fn scan_frames<R: Read + Seek>(reader: &mut R, start: u64, len: u64) -> FrameScan {
    let mut scan = FrameScan::default();
    if let Err(e) = walk_frames(reader, start, len, &mut scan) {
        debug!("MPEG frame walk stopped after {} frames: {e}", scan.frames);
    }
    scan
}

fn walk_frames<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    len: u64,
    scan: &mut FrameScan,
) -> io::Result<()> {
    if len < start + 4 {
        return Ok(());
    }
    // offset of `window` in the data
    let mut pos = start;
    let mut window: [u8; 4] = read_array(reader)?;
    // `window` sits right where a trusted frame ended
    let mut synced = false;
    scan.leading_header = FrameHeader::parse(window).is_some();

    loop {
        let Some(frame) = FrameHeader::parse(window) else {
            synced = false;
            if pos + 4 >= len {
                return Ok(());
            }
            let [byte]: [u8; 1] = read_array(reader)?;
            window.rotate_left(1);
            window[3] = byte;
            pos += 1;
            continue;
        };

        let end = pos + frame.length;
        if end > len {
            // truncated final frame
            return Ok(());
        }
        discard(reader, frame.length - 4)?;
        let next: Option<[u8; 4]> = if end + 4 <= len {
            Some(read_array(reader)?)
        } else {
            None
        };

        let trusted = synced
            || match next {
                Some(next) => FrameHeader::parse(next).is_some() || next.starts_with(ID3V1_MARKER),
                None => end == len,
            };
        if !trusted {
            // lookalike header inside junk
            pos += 1;
            if pos + 4 > len {
                return Ok(());
            }
            reader.seek(SeekFrom::Start(pos))?;
            window = read_array(reader)?;
            continue;
        }

        scan.frames += 1;
        scan.seconds += frame.seconds();
        let Some(next) = next else {
            return Ok(());
        };
        window = next;
        pos = end;
        synced = true;
    }
}

/// Reads past `n` bytes without seeking, so buffered readers keep their buffer.
fn discard<R: Read>(reader: &mut R, n: u64) -> io::Result<()> {
    let copied = io::copy(&mut reader.by_ref().take(n), &mut io::sink())?;
    if copied < n {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}
