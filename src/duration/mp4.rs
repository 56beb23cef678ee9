use std::io::{Read, Seek, SeekFrom};

use super::{read_array, round_seconds, skip};
use crate::error::DurationError;

/// Byte range of a box's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoxSpan {
    payload_start: u64,
    end: u64,
}

impl BoxSpan {
    fn payload_len(&self) -> u64 {
        self.end - self.payload_start
    }
}

/// Duration from `moov/mvhd`: duration units over timescale.
pub(super) fn duration<R: Read + Seek>(reader: &mut R, len: u64) -> Result<u64, DurationError> {
    let moov = find_box(reader, 0, len, b"moov")?.ok_or(DurationError::BoxNotFound("moov"))?;
    let mvhd = find_box(reader, moov.payload_start, moov.end, b"mvhd")?
        .ok_or(DurationError::BoxNotFound("mvhd"))?;

    reader.seek(SeekFrom::Start(mvhd.payload_start))?;
    let (timescale, units) = read_mvhd(reader, mvhd.payload_len())?;
    if timescale == 0 {
        return Err(DurationError::ZeroField("timescale"));
    }
    Ok(round_seconds(u64::from(units), u64::from(timescale)))
}

/// Walks sibling boxes in `start..end` and returns the first one of type `kind`.
fn find_box<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    kind: &[u8; 4],
) -> Result<Option<BoxSpan>, DurationError> {
    let mut pos = start;
    while end - pos >= 8 {
        reader.seek(SeekFrom::Start(pos))?;
        let header: [u8; 8] = read_array(reader)?;
        let box_type = [header[4], header[5], header[6], header[7]];

        let (size, header_len) = match u32::from_be_bytes([header[0], header[1], header[2], header[3]]) {
            // 64-bit largesize follows the type
            1 => {
                if end - pos < 16 {
                    return Err(malformed(&box_type, 1));
                }
                let large: [u8; 8] = read_array(reader)?;
                (u64::from_be_bytes(large), 16)
            }
            // box extends to the end of its parent
            0 => (end - pos, 8),
            n => (u64::from(n), 8),
        };
        if size < header_len || size > end - pos {
            return Err(malformed(&box_type, size));
        }

        if &box_type == kind {
            return Ok(Some(BoxSpan {
                payload_start: pos + header_len,
                end: pos + size,
            }));
        }
        pos += size;
    }
    Ok(None)
}

fn malformed(box_type: &[u8; 4], size: u64) -> DurationError {
    DurationError::MalformedBox {
        kind: format!("'{}' box", String::from_utf8_lossy(box_type)),
        size,
    }
}

/// Reads `(timescale, duration)` from an `mvhd` payload.
///
/// Version 0 carries 32-bit times, version 1 carries 64-bit creation and
/// modification times. Both are followed by a 32-bit timescale and a
/// 32-bit duration word. In version 1 a zero duration word is the high
/// half of a 64-bit duration, so the low half is read instead.
fn read_mvhd<R: Read + Seek>(reader: &mut R, payload_len: u64) -> Result<(u32, u32), DurationError> {
    let too_short = || DurationError::MalformedBox {
        kind: "'mvhd' box".to_string(),
        size: payload_len,
    };
    if payload_len < 4 {
        return Err(too_short());
    }
    let [version, ..]: [u8; 4] = read_array(reader)?;

    let times_len = match version {
        0 => 8,
        1 => 16,
        _ => return Err(DurationError::InvalidHeader("unknown mvhd version")),
    };
    if payload_len < 4 + times_len + 8 {
        return Err(too_short());
    }
    skip(reader, times_len)?;

    let timescale = u32::from_be_bytes(read_array(reader)?);
    let mut units = u32::from_be_bytes(read_array(reader)?);
    if version == 1 && units == 0 && payload_len >= 4 + times_len + 12 {
        units = u32::from_be_bytes(read_array(reader)?);
    }
    Ok((timescale, units))
}
