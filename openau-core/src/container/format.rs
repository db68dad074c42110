//! `fmt ` chunk parsing

use std::io::{Read, Seek};

use tracing::debug;

use super::reader::ChunkReader;
use super::FMT_TAG;
use crate::descriptor::{SampleFormat, StreamDescriptor, FORMAT_TAG_IEEE_FLOAT, FORMAT_TAG_PCM};
use crate::error::{Error, Result};

/// Size of the mandatory part of a format chunk
const FMT_BASE_LEN: u32 = 16;

/// Size of the mandatory part plus the extension-size field
const FMT_EXTENDED_BASE_LEN: u32 = 18;

/// Parse a format chunk body of declared length `len`.
///
/// `reader` must be positioned at the first byte of the chunk body. On
/// success the cursor sits immediately after the declared body (extension
/// bytes included); the RIFF pad byte is the caller's business.
pub fn parse_format_chunk<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    len: u32,
) -> Result<StreamDescriptor> {
    if len < FMT_BASE_LEN {
        return Err(Error::malformed(
            FMT_TAG,
            format!("declared length {} is shorter than {}", len, FMT_BASE_LEN),
        ));
    }

    let format_tag = reader.read_u16()?;
    if format_tag != FORMAT_TAG_PCM && format_tag != FORMAT_TAG_IEEE_FLOAT {
        return Err(Error::UnsupportedFormat(format_tag));
    }

    let channel_count = reader.read_u16()?;
    if channel_count == 0 {
        return Err(Error::InconsistentHeader("channel count is zero".to_string()));
    }

    let sample_rate = reader.read_u32()?;
    let byte_rate = reader.read_u32()?;
    let block_align = reader.read_u16()?;
    let bits_per_sample = reader.read_u16()?;

    if sample_rate == 0 {
        return Err(Error::InconsistentHeader("sample rate is zero".to_string()));
    }

    let sample_format = SampleFormat::from_wav(format_tag, bits_per_sample).ok_or(
        Error::UnsupportedSampleFormat {
            format_tag,
            bits_per_sample,
        },
    )?;
    let bytes_per_sample = bits_per_sample / 8;

    let expected_align = u32::from(bytes_per_sample) * u32::from(channel_count);
    if u32::from(block_align) != expected_align {
        return Err(Error::InconsistentHeader(format!(
            "block align {} != {} channels * {} bytes per sample",
            block_align, channel_count, bytes_per_sample
        )));
    }

    let expected_rate = u64::from(sample_rate) * u64::from(expected_align);
    if u64::from(byte_rate) != expected_rate {
        return Err(Error::InconsistentHeader(format!(
            "byte rate {} != {} Hz * {} channels * {} bytes per sample",
            byte_rate, sample_rate, channel_count, bytes_per_sample
        )));
    }

    if len > FMT_BASE_LEN {
        if len < FMT_EXTENDED_BASE_LEN {
            return Err(Error::malformed(
                FMT_TAG,
                format!("declared length {} leaves no room for the extension size", len),
            ));
        }
        let extension_size = reader.read_u16()?;
        if len != FMT_EXTENDED_BASE_LEN + u32::from(extension_size) {
            return Err(Error::malformed(
                FMT_TAG,
                format!(
                    "declared length {} != {} + extension size {}",
                    len, FMT_EXTENDED_BASE_LEN, extension_size
                ),
            ));
        }
        reader.skip(u64::from(extension_size))?;
    }

    debug!(
        "fmt chunk: tag={}, channels={}, rate={} Hz, bits={}",
        format_tag, channel_count, sample_rate, bits_per_sample
    );

    Ok(StreamDescriptor {
        sample_rate,
        channel_count,
        bits_per_sample,
        bytes_per_sample,
        sample_format,
        block_align,
        byte_rate,
    })
}
