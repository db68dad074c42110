//! Audio backend interface
//!
//! The OS audio layer is an external collaborator. The core only talks to it
//! through [`AudioBackend`] and [`StreamHandle`]: it enumerates devices,
//! probes format support, and injects a [`StreamCallback`] into
//! `open_stream`. Device lifetimes stay with the backend.

mod load;
mod null;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::SampleFormat;
use crate::error::{Error, Result};
use crate::feeder::FeedStatus;

pub use load::{buffer_duration, CpuLoadMeter};
pub use null::{NullBackend, NullBackendConfig};

/// Read-only snapshot of one device, as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
    pub host_api_name: String,
    pub max_input_channels: u16,
    pub max_output_channels: u16,
    /// Sample rate the backend opens the device at by default
    pub default_sample_rate: u32,
    pub default_low_latency: Duration,
    pub default_high_latency: Duration,
}

/// Parameters for opening an output stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamParameters {
    pub channel_count: u16,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    pub suggested_latency: Duration,
    /// Frames per callback; None lets the backend choose
    pub frames_per_buffer: Option<u32>,
}

impl StreamParameters {
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.channel_count) * usize::from(self.sample_format.bytes_per_sample())
    }
}

/// Real-time callback handed to the backend.
///
/// Receives the output buffer as raw interleaved little-endian bytes; the
/// buffer length is always a whole number of frames.
pub type StreamCallback = Box<dyn FnMut(&mut [u8]) -> FeedStatus + Send + 'static>;

/// An opened output stream
pub trait StreamHandle {
    /// Begin invoking the callback
    fn start(&mut self) -> Result<()>;

    /// Stop invoking the callback and release the stream.
    ///
    /// When this returns the callback will not run again and has been
    /// dropped (together with everything it owns).
    fn close(&mut self) -> Result<()>;

    /// Fraction of the real-time budget the callback is using (0.0 - 1.0+)
    fn cpu_load(&self) -> f64;
}

/// The external audio layer
pub trait AudioBackend {
    /// Short backend name for logs
    fn name(&self) -> &str;

    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Index of the default input device, if any
    fn default_input_device(&self) -> Option<usize>;

    /// Index of the default output device, if any
    fn default_output_device(&self) -> Option<usize>;

    /// True if `device` can open an output stream with `params`.
    /// Latency and buffer size are ignored.
    fn is_format_supported(&self, device: &DeviceDescriptor, params: &StreamParameters) -> bool;

    fn open_stream(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParameters,
        callback: StreamCallback,
    ) -> Result<Box<dyn StreamHandle>>;
}

/// How to pick the output device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    #[default]
    DefaultOutput,
    Index(usize),
    Name(String),
}

impl DeviceSelector {
    /// Find the selected device among `devices`.
    pub fn resolve<'a>(
        &self,
        backend: &dyn AudioBackend,
        devices: &'a [DeviceDescriptor],
    ) -> Result<&'a DeviceDescriptor> {
        let found = match self {
            DeviceSelector::DefaultOutput => backend
                .default_output_device()
                .and_then(|index| devices.iter().find(|d| d.index == index)),
            DeviceSelector::Index(index) => devices.iter().find(|d| d.index == *index),
            DeviceSelector::Name(name) => devices.iter().find(|d| d.name == *name),
        };
        found.ok_or_else(|| Error::DeviceNotFound(self.to_string()))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::DefaultOutput => f.write_str("default output"),
            DeviceSelector::Index(index) => write!(f, "device #{}", index),
            DeviceSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = std::convert::Infallible;

    /// `"default"` (any case) or empty selects the default output, a number
    /// selects by index, anything else by exact name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("default") {
            return Ok(DeviceSelector::DefaultOutput);
        }
        Ok(match s.parse::<usize>() {
            Ok(index) => DeviceSelector::Index(index),
            Err(_) => DeviceSelector::Name(s.to_string()),
        })
    }
}

/// Which of the device's default latencies to suggest when opening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyPreference {
    #[default]
    Low,
    High,
}

impl LatencyPreference {
    pub fn pick(&self, device: &DeviceDescriptor) -> Duration {
        match self {
            LatencyPreference::Low => device.default_low_latency,
            LatencyPreference::High => device.default_high_latency,
        }
    }
}

impl FromStr for LatencyPreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(LatencyPreference::Low),
            "high" => Ok(LatencyPreference::High),
            other => Err(format!("invalid latency '{}' (expected 'low' or 'high')", other)),
        }
    }
}

/// Caller-tunable output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub latency: LatencyPreference,
    pub frames_per_buffer: Option<u32>,
}
