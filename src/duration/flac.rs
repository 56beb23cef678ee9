use std::io::{Read, Seek};

use super::{read_array, round_seconds, skip, skip_id3v2};
use crate::error::DurationError;

const STREAMINFO: u8 = 0;
const STREAMINFO_LEN: u64 = 34;

/// Duration from the STREAMINFO block: total samples over sample rate.
pub(super) fn duration<R: Read + Seek>(reader: &mut R, len: u64) -> Result<u64, DurationError> {
    let start = skip_id3v2(reader, len)?;
    if len - start < 4 {
        return Err(DurationError::InvalidHeader("missing fLaC marker"));
    }
    let marker: [u8; 4] = read_array(reader)?;
    if &marker != b"fLaC" {
        return Err(DurationError::InvalidHeader("missing fLaC marker"));
    }

    let mut pos = start + 4;
    while len - pos >= 4 {
        let header: [u8; 4] = read_array(reader)?;
        pos += 4;

        let is_last = header[0] & 0x80 != 0;
        let kind = header[0] & 0x7F;
        let size = u64::from(u32::from_be_bytes([0, header[1], header[2], header[3]]));
        if size > len - pos {
            return Err(DurationError::MalformedBox {
                kind: format!("FLAC metadata block {kind}"),
                size,
            });
        }

        if kind == STREAMINFO {
            if size < STREAMINFO_LEN {
                return Err(DurationError::MalformedBox {
                    kind: "STREAMINFO".to_string(),
                    size,
                });
            }
            let info: [u8; STREAMINFO_LEN as usize] = read_array(reader)?;
            return duration_from_streaminfo(&info);
        }

        skip(reader, size)?;
        pos += size;
        if is_last {
            break;
        }
    }

    Err(DurationError::MissingStreamInfo)
}

fn duration_from_streaminfo(info: &[u8; STREAMINFO_LEN as usize]) -> Result<u64, DurationError> {
    // bytes 10..18: sample rate (20 bits), channels (3), bits per sample (5), total samples (36)
    let sample_rate = (u64::from(info[10]) << 12)
        | (u64::from(info[11]) << 4)
        | u64::from(info[12] >> 4);
    let total_samples = (u64::from(info[13] & 0x0F) << 32)
        | u64::from(u32::from_be_bytes([info[14], info[15], info[16], info[17]]));

    if sample_rate == 0 {
        return Err(DurationError::ZeroField("sample rate"));
    }
    if total_samples == 0 {
        return Err(DurationError::ZeroField("total samples"));
    }

    Ok(round_seconds(total_samples, sample_rate))
}
