//! Core stream data types
//!
//! Defines the canonical stream descriptor derived from a container's format
//! chunk, and the sample formats the pipeline can carry.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Format tag for linear PCM
pub const FORMAT_TAG_PCM: u16 = 1;

/// Format tag for IEEE floating point
pub const FORMAT_TAG_IEEE_FLOAT: u16 = 3;

/// Sample encoding of the PCM payload.
///
/// `Int8` is 8-bit PCM as stored in WAV files, which is unsigned with an
/// offset of 128. All wider integer formats are signed little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SampleFormat {
    Int8,
    Int16,
    Int24,
    Int32,
    Float32,
}

impl SampleFormat {
    /// Map a format tag and bit depth to a sample format.
    ///
    /// Returns None for any combination outside the five supported ones.
    pub fn from_wav(format_tag: u16, bits_per_sample: u16) -> Option<Self> {
        match (format_tag, bits_per_sample) {
            (FORMAT_TAG_PCM, 8) => Some(SampleFormat::Int8),
            (FORMAT_TAG_PCM, 16) => Some(SampleFormat::Int16),
            (FORMAT_TAG_PCM, 24) => Some(SampleFormat::Int24),
            (FORMAT_TAG_PCM, 32) => Some(SampleFormat::Int32),
            (FORMAT_TAG_IEEE_FLOAT, 32) => Some(SampleFormat::Float32),
            _ => None,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            SampleFormat::Int8 => 8,
            SampleFormat::Int16 => 16,
            SampleFormat::Int24 => 24,
            SampleFormat::Int32 | SampleFormat::Float32 => 32,
        }
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample() / 8
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::Int8 => "8-bit PCM",
            SampleFormat::Int16 => "16-bit PCM",
            SampleFormat::Int24 => "24-bit PCM",
            SampleFormat::Int32 => "32-bit PCM",
            SampleFormat::Float32 => "32-bit float",
        };
        f.write_str(name)
    }
}

/// Canonical description of a PCM stream, derived once per file.
///
/// All fields have been validated against each other by the format chunk
/// parser: `bytes_per_sample * channel_count == block_align` and
/// `sample_rate * channel_count * bytes_per_sample == byte_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
    pub bytes_per_sample: u16,
    pub sample_format: SampleFormat,
    /// Bytes per frame as declared in the container
    pub block_align: u16,
    /// Bytes per second as declared in the container
    pub byte_rate: u32,
}

impl StreamDescriptor {
    /// Bytes in one frame (one sample per channel)
    pub fn frame_bytes(&self) -> usize {
        self.block_align as usize
    }

    /// True when the descriptor can drive a stream: non-zero rate, channels
    /// and sample width.
    pub fn is_playable(&self) -> bool {
        self.sample_rate > 0 && self.channel_count > 0 && self.bytes_per_sample > 0
    }

    /// Playback duration of `frames` frames at this descriptor's rate
    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let rate = u64::from(self.sample_rate);
        let secs = frames / rate;
        let nanos = (frames % rate) * 1_000_000_000 / rate;
        Duration::new(secs, nanos as u32)
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} channel{}, {}",
            self.sample_rate,
            self.channel_count,
            if self.channel_count == 1 { "" } else { "s" },
            self.sample_format
        )
    }
}
