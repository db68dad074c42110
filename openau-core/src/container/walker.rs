//! Top-level chunk walk of a RIFF/WAVE container

use std::io::{Read, Seek};

use tracing::{debug, warn};

use super::format::parse_format_chunk;
use super::reader::ChunkReader;
use super::{
    ChunkHeader, DataRegion, WavLayout, DATA_TAG, FMT_TAG, RIFF_TAG, STREAMING_DATA_LEN, WAVE_TAG,
};
use crate::descriptor::StreamDescriptor;
use crate::error::{Error, Result};

/// Walk the container from its first byte to the start of the PCM data.
///
/// On success the reader is positioned at the first byte of the `data`
/// chunk body. Unknown chunks are skipped by their declared length plus the
/// RIFF pad byte when that length is odd. Every iteration consumes at least a
/// chunk header or fails, so the walk terminates on any input.
pub fn walk_container<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<WavLayout> {
    read_preamble(reader)?;

    let mut descriptor: Option<StreamDescriptor> = None;

    loop {
        let header = ChunkHeader::read(reader)?;

        if header.id == *FMT_TAG {
            if descriptor.is_some() {
                warn!("Container has more than one fmt chunk; using the last one");
            }
            descriptor = Some(parse_format_chunk(reader, header.length)?);
            skip_pad(reader, header.length)?;
        } else if header.id == *DATA_TAG {
            let descriptor = descriptor
                .filter(StreamDescriptor::is_playable)
                .ok_or(Error::DataBeforeFormat)?;
            let data = data_region(reader, header.length)?;
            debug!(
                "data chunk: offset={}, len={} ({} frames)",
                data.offset,
                data.len,
                data.len / descriptor.frame_bytes() as u64
            );
            return Ok(WavLayout { descriptor, data });
        } else {
            debug!(
                "Skipping chunk '{}' ({} bytes)",
                String::from_utf8_lossy(&header.id),
                header.length
            );
            reader.skip(u64::from(header.length))?;
            skip_pad(reader, header.length)?;
        }
    }
}

fn read_preamble<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<()> {
    let riff = reader.read_tag()?;
    if riff != *RIFF_TAG {
        return Err(Error::NotAContainer(format!(
            "expected 'RIFF', found {:?}",
            String::from_utf8_lossy(&riff)
        )));
    }

    let riff_len = reader.read_u32()?;

    let wave = reader.read_tag()?;
    if wave != *WAVE_TAG {
        return Err(Error::NotAContainer(format!(
            "expected 'WAVE', found {:?}",
            String::from_utf8_lossy(&wave)
        )));
    }

    if u64::from(riff_len) + 8 != reader.len() {
        debug!(
            "RIFF size field {} does not match file size {}",
            riff_len,
            reader.len()
        );
    }
    Ok(())
}

fn data_region<R: Read + Seek>(reader: &ChunkReader<R>, declared: u32) -> Result<DataRegion> {
    let offset = reader.position();
    let remaining = reader.remaining();

    let len = if declared == STREAMING_DATA_LEN {
        debug!("data chunk length unknown, playing to end of file");
        remaining
    } else if u64::from(declared) > remaining {
        return Err(Error::TruncatedInput {
            offset,
            needed: u64::from(declared),
            available: remaining,
        });
    } else {
        u64::from(declared)
    };

    Ok(DataRegion { offset, len })
}

fn skip_pad<R: Read + Seek>(reader: &mut ChunkReader<R>, len: u32) -> Result<()> {
    if len & 1 == 1 {
        reader.skip(1)?;
    }
    Ok(())
}
