//! RIFF/WAVE container parsing
//!
//! Walks an untrusted byte stream from the `RIFF` preamble to the first PCM
//! byte of the `data` chunk, validating the format chunk along the way.
//!
//! Layout consumed (all integers little-endian):
//!
//! ```text
//! "RIFF" u32:riff_size "WAVE"
//! { [u8; 4]:chunk_id  u32:chunk_len  chunk_len bytes  [pad byte if chunk_len is odd] }*
//! ```

mod format;
mod reader;
mod walker;

use std::io::{Read, Seek};

pub use format::parse_format_chunk;
pub use reader::ChunkReader;
pub use walker::walk_container;

use crate::descriptor::StreamDescriptor;
use crate::error::Result;

pub const RIFF_TAG: &[u8; 4] = b"RIFF";
pub const WAVE_TAG: &[u8; 4] = b"WAVE";
pub const FMT_TAG: &[u8; 4] = b"fmt ";
pub const DATA_TAG: &[u8; 4] = b"data";

/// Data chunk length written by encoders that stream without knowing the
/// final size; means "until end of file".
pub const STREAMING_DATA_LEN: u32 = u32::MAX;

/// Tagged, length-prefixed chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: [u8; 4],
    pub length: u32,
}

impl ChunkHeader {
    pub fn read<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<Self> {
        let id = reader.read_tag()?;
        let length = reader.read_u32()?;
        Ok(Self { id, length })
    }
}

/// Byte range of the PCM payload within the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRegion {
    /// Absolute offset of the first PCM byte
    pub offset: u64,
    /// Number of PCM bytes
    pub len: u64,
}

/// Result of a successful container walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavLayout {
    pub descriptor: StreamDescriptor,
    pub data: DataRegion,
}

impl WavLayout {
    /// Whole frames held by the data chunk
    pub fn total_frames(&self) -> u64 {
        self.data.len / self.descriptor.frame_bytes() as u64
    }
}

/// Parse a complete container from `input`, leaving it positioned at the
/// first PCM byte.
pub fn read_layout<R: Read + Seek>(input: R) -> Result<(WavLayout, R)> {
    let mut reader = ChunkReader::new(input)?;
    let layout = walk_container(&mut reader)?;
    Ok((layout, reader.into_inner()))
}
