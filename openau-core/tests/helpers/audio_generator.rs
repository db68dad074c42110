//! WAV file generation via hound
//!
//! hound switches to WAVE_FORMAT_EXTENSIBLE above 16 bits or 2 channels, so
//! only 8/16-bit mono/stereo files are generated here. Everything else is
//! built byte-by-byte with [`super::WavBuilder`].

use std::path::Path;

use hound::{WavSpec, WavWriter};

/// Deterministic 16-bit sample value for `frame`/`channel`
pub fn ramp_sample(frame: u32, channel: u16) -> i16 {
    ((frame as i32 * 97 + i32::from(channel) * 1000) % 30000) as i16
}

/// Write `frames` frames of [`ramp_sample`] as 16-bit PCM
pub fn generate_pcm16_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..frames {
        for channel in 0..channels {
            writer.write_sample(ramp_sample(frame, channel))?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Write `frames` frames of a sawtooth as 8-bit PCM
pub fn generate_pcm8_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..frames {
        for _ in 0..channels {
            writer.write_sample((frame % 256) as u8 as i8)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
