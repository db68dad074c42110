//! Hand-assembled RIFF/WAVE files
//!
//! Lets tests produce layouts no encoder would write: misordered chunks,
//! lying length fields, bogus format fields.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct WavBuilder {
    chunks: Vec<Vec<u8>>,
    riff_size: Option<u32>,
}

impl WavBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent PCM `fmt ` chunk
    pub fn pcm_fmt(self, channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        let block_align = channels * bits_per_sample.div_ceil(8);
        self.fmt(
            1,
            channels,
            sample_rate,
            sample_rate * u32::from(block_align),
            block_align,
            bits_per_sample,
        )
    }

    /// `fmt ` chunk with every field given explicitly
    pub fn fmt(
        self,
        format_tag: u16,
        channels: u16,
        sample_rate: u32,
        byte_rate: u32,
        block_align: u16,
        bits_per_sample: u16,
    ) -> Self {
        let mut body = Vec::with_capacity(16);
        body.extend_from_slice(&format_tag.to_le_bytes());
        body.extend_from_slice(&channels.to_le_bytes());
        body.extend_from_slice(&sample_rate.to_le_bytes());
        body.extend_from_slice(&byte_rate.to_le_bytes());
        body.extend_from_slice(&block_align.to_le_bytes());
        body.extend_from_slice(&bits_per_sample.to_le_bytes());
        self.chunk(b"fmt ", &body)
    }

    /// Well-formed chunk; odd bodies get their pad byte
    pub fn chunk(mut self, id: &[u8; 4], body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(8 + body.len() + 1);
        bytes.extend_from_slice(id);
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(body);
        if body.len() % 2 == 1 {
            bytes.push(0);
        }
        self.chunks.push(bytes);
        self
    }

    /// Chunk whose header declares `declared_len` regardless of `body`
    pub fn chunk_with_len(mut self, id: &[u8; 4], declared_len: u32, body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(8 + body.len());
        bytes.extend_from_slice(id);
        bytes.extend_from_slice(&declared_len.to_le_bytes());
        bytes.extend_from_slice(body);
        self.chunks.push(bytes);
        self
    }

    pub fn data(self, body: &[u8]) -> Self {
        self.chunk(b"data", body)
    }

    /// Override the RIFF size field
    pub fn riff_size(mut self, size: u32) -> Self {
        self.riff_size = Some(size);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let body_len: usize = self.chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(12 + body_len);
        bytes.extend_from_slice(b"RIFF");
        let size = self.riff_size.unwrap_or(4 + body_len as u32);
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        for chunk in &self.chunks {
            bytes.extend_from_slice(chunk);
        }
        bytes
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.build()).expect("Failed to write WAV fixture");
        path
    }
}

/// Interleaved 16-bit frames whose samples encode their own position
pub fn pcm16_frames(frames: u16, channels: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(usize::from(frames) * usize::from(channels) * 2);
    for frame in 0..frames {
        for channel in 0..channels {
            let value = (frame as i16).wrapping_mul(10).wrapping_add(channel as i16 + 1);
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}
