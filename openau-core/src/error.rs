//! Error types for openau-core
//!
//! Every failure before streaming starts surfaces as one of these variants.
//! Nothing here is ever raised from inside the real-time feed path; I/O errors
//! there are recorded on the [`FeedMonitor`](crate::feeder::FeedMonitor) instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::SampleFormat;

/// Common result type for openau-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing a container, negotiating a device format, or
/// driving a session.
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer bytes were available than a read or skip demanded
    #[error("Truncated input: needed {needed} bytes at offset {offset}, only {available} available")]
    TruncatedInput {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Bad RIFF/WAVE preamble
    #[error("Not a RIFF/WAVE container: {0}")]
    NotAContainer(String),

    /// Declared chunk length inconsistent with its content
    #[error("Malformed '{tag}' chunk: {reason}")]
    MalformedChunk { tag: String, reason: String },

    /// Cross-field arithmetic invariant of the format chunk violated
    #[error("Inconsistent format header: {0}")]
    InconsistentHeader(String),

    /// Format tag is neither linear PCM (1) nor IEEE float (3)
    #[error("Unsupported format tag {0:#06x} (only PCM and IEEE float are supported)")]
    UnsupportedFormat(u16),

    /// Format tag / bit depth combination is not one of the five supported
    #[error("Unsupported sample format: format tag {format_tag} with {bits_per_sample} bits per sample")]
    UnsupportedSampleFormat { format_tag: u16, bits_per_sample: u16 },

    /// Data chunk reached without a valid prior format chunk
    #[error("Data chunk reached before a valid format chunk")]
    DataBeforeFormat,

    /// Device cannot serve the file's sample rate
    #[error("Device '{device}' cannot play {requested} Hz (supported standard rates: {supported:?})")]
    UnsupportedRate {
        device: String,
        requested: u32,
        supported: Vec<u32>,
    },

    /// Device accepts no standard rate at all for the file's sample format
    #[error("Device '{device}' does not accept {sample_format} samples")]
    UnsupportedDeviceFormat {
        device: String,
        sample_format: SampleFormat,
    },

    /// Device has fewer output channels than the file
    #[error("Device '{device}' has {available} output channels, file needs {requested}")]
    UnsupportedChannels {
        device: String,
        requested: u16,
        available: u16,
    },

    /// Device selector matched nothing the backend enumerated
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Opaque failure surfaced by the external audio layer
    #[error("Audio backend error: {0}")]
    BackendError(String),

    /// Operation not valid in the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Opening the input file failed
    #[error("Failed to open {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error other than running out of input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(tag: &[u8; 4], reason: impl Into<String>) -> Self {
        Error::MalformedChunk {
            tag: String::from_utf8_lossy(tag).into_owned(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the file's contents rather than the device
    /// or the environment.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::TruncatedInput { .. }
                | Error::NotAContainer(_)
                | Error::MalformedChunk { .. }
                | Error::InconsistentHeader(_)
                | Error::UnsupportedFormat(_)
                | Error::UnsupportedSampleFormat { .. }
                | Error::DataBeforeFormat
        )
    }
}
