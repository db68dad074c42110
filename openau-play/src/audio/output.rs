//! Audio output using cpal
//!
//! Implements [`AudioBackend`] over the default cpal host. Devices are
//! addressed by their position in the host's device list, which is what
//! [`DeviceDescriptor::index`] reports.
//!
//! Streams are opened with `build_output_stream_raw` in the file's own
//! sample format, so the feeder writes straight into the device buffer with
//! no conversion. cpal expects native-endian samples; on big-endian hosts
//! the little-endian WAV bytes are swapped in place after each feed.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, Host, Stream, StreamConfig, SupportedBufferSize};
use openau_core::backend::{buffer_duration, CpuLoadMeter};
use openau_core::{
    AudioBackend, DeviceDescriptor, Error, Result, SampleFormat, StreamCallback,
    StreamHandle, StreamParameters,
};
use tracing::{debug, error, info, warn};

/// Buffer size assumed for the low-latency suggestion when the device
/// reports no range
const LOW_LATENCY_FRAMES: u32 = 256;
const HIGH_LATENCY_FRAMES: u32 = 2048;

/// cpal sample type carrying the same bytes as a WAV sample format.
///
/// 8-bit WAV is unsigned, like cpal's `U8`. cpal has no packed 24-bit type.
pub fn to_cpal_format(format: SampleFormat) -> Option<cpal::SampleFormat> {
    match format {
        SampleFormat::Int8 => Some(cpal::SampleFormat::U8),
        SampleFormat::Int16 => Some(cpal::SampleFormat::I16),
        SampleFormat::Int24 => None,
        SampleFormat::Int32 => Some(cpal::SampleFormat::I32),
        SampleFormat::Float32 => Some(cpal::SampleFormat::F32),
    }
}

/// Backend over the platform's default cpal host
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using cpal host {}", host.id().name());
        Self { host }
    }

    fn devices(&self) -> Result<Vec<Device>> {
        self.host
            .devices()
            .map(|devices| devices.collect())
            .map_err(|e| Error::BackendError(format!("Failed to enumerate devices: {}", e)))
    }

    /// Device at `descriptor.index`, checked against the name it had when
    /// enumerated so a hot-plug between enumeration and open is caught.
    fn device_for(&self, descriptor: &DeviceDescriptor) -> Result<Device> {
        let device = self
            .devices()?
            .into_iter()
            .nth(descriptor.index)
            .ok_or_else(|| Error::DeviceNotFound(format!("device #{}", descriptor.index)))?;
        match device.name() {
            Ok(name) if name == descriptor.name => Ok(device),
            _ => Err(Error::DeviceNotFound(descriptor.name.clone())),
        }
    }

    /// Index of the device whose name matches `default`
    fn index_of(&self, default: Option<Device>) -> Option<usize> {
        let name = default?.name().ok()?;
        self.devices()
            .ok()?
            .iter()
            .position(|device| device.name().ok().as_deref() == Some(name.as_str()))
    }

    fn describe(&self, index: usize, device: &Device) -> DeviceDescriptor {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let max_output_channels = device
            .supported_output_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0);
        let max_input_channels = device
            .supported_input_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0);

        let default_config = device
            .default_output_config()
            .or_else(|_| device.default_input_config());
        let (default_sample_rate, buffer_range) = match &default_config {
            Ok(config) => (config.sample_rate().0, config.buffer_size().clone()),
            Err(e) => {
                debug!("No default config for '{}': {}", name, e);
                (0, SupportedBufferSize::Unknown)
            }
        };

        let low = clamp_frames(LOW_LATENCY_FRAMES, &buffer_range);
        let high = clamp_frames(HIGH_LATENCY_FRAMES, &buffer_range);

        DeviceDescriptor {
            index,
            name,
            host_api_name: self.host.id().name().to_string(),
            max_input_channels,
            max_output_channels,
            default_sample_rate,
            default_low_latency: buffer_duration(low as usize, default_sample_rate),
            default_high_latency: buffer_duration(high as usize, default_sample_rate),
        }
    }

    /// Output config range matching `params` exactly (channels, format, rate)
    fn matching_range(device: &Device, params: &StreamParameters) -> Option<SupportedBufferSize> {
        let format = to_cpal_format(params.sample_format)?;
        let configs = device.supported_output_configs().ok()?;
        configs
            .filter(|c| {
                c.channels() == params.channel_count
                    && c.sample_format() == format
                    && c.min_sample_rate().0 <= params.sample_rate
                    && c.max_sample_rate().0 >= params.sample_rate
            })
            .map(|c| c.buffer_size().clone())
            .next()
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let devices: Vec<DeviceDescriptor> = self
            .devices()?
            .iter()
            .enumerate()
            .map(|(index, device)| self.describe(index, device))
            .collect();
        debug!("Found {} audio devices", devices.len());
        Ok(devices)
    }

    fn default_input_device(&self) -> Option<usize> {
        self.index_of(self.host.default_input_device())
    }

    fn default_output_device(&self) -> Option<usize> {
        self.index_of(self.host.default_output_device())
    }

    fn is_format_supported(&self, device: &DeviceDescriptor, params: &StreamParameters) -> bool {
        match self.device_for(device) {
            Ok(cpal_device) => Self::matching_range(&cpal_device, params).is_some(),
            Err(_) => false,
        }
    }

    fn open_stream(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParameters,
        callback: StreamCallback,
    ) -> Result<Box<dyn StreamHandle>> {
        let cpal_format = to_cpal_format(params.sample_format).ok_or_else(|| {
            Error::BackendError(format!("cpal cannot play {} samples", params.sample_format))
        })?;
        let cpal_device = self.device_for(device)?;
        let range = Self::matching_range(&cpal_device, params).ok_or_else(|| {
            Error::BackendError(format!(
                "'{}' rejected {} channels of {} at {} Hz",
                device.name, params.channel_count, params.sample_format, params.sample_rate
            ))
        })?;

        let buffer_size = choose_buffer_size(params, &range);
        let config = StreamConfig {
            channels: params.channel_count,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size,
        };
        debug!(
            "Opening '{}': {} Hz, {} channels, {:?}, buffer {:?}",
            device.name, params.sample_rate, params.channel_count, cpal_format, config.buffer_size
        );

        let meter = Arc::new(CpuLoadMeter::new());
        let error_flag = Arc::new(AtomicBool::new(false));
        let error_count = Arc::new(AtomicU32::new(0));

        let data_callback = {
            let meter = Arc::clone(&meter);
            let frame_bytes = params.frame_bytes();
            #[cfg(target_endian = "big")]
            let sample_bytes = usize::from(params.sample_format.bytes_per_sample());
            let sample_rate = params.sample_rate;
            let mut callback = callback;
            move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                let started = Instant::now();
                let bytes = data.bytes_mut();
                let frames = bytes.len() / frame_bytes;
                callback(bytes);
                #[cfg(target_endian = "big")]
                swap_sample_bytes(bytes, sample_bytes);
                meter.record(started.elapsed(), buffer_duration(frames, sample_rate));
            }
        };

        let error_callback = {
            let error_flag = Arc::clone(&error_flag);
            let error_count = Arc::clone(&error_count);
            move |err: cpal::StreamError| {
                error!("Audio stream error: {}", err);
                error_flag.store(true, Ordering::SeqCst);
                error_count.fetch_add(1, Ordering::SeqCst);
            }
        };

        let stream = cpal_device
            .build_output_stream_raw(&config, cpal_format, data_callback, error_callback, None)
            .map_err(|e| Error::BackendError(format!("Failed to build stream: {}", e)))?;

        Ok(Box::new(CpalStream {
            device_name: device.name.clone(),
            stream: Some(stream),
            meter,
            error_flag,
            error_count,
        }))
    }
}

/// A cpal output stream owning the feed callback
pub struct CpalStream {
    device_name: String,
    stream: Option<Stream>,
    meter: Arc<CpuLoadMeter>,
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl CpalStream {
    /// True if the device reported an error since the stream was built
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }
}

impl StreamHandle for CpalStream {
    fn start(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::InvalidState("stream already closed".to_string()))?;
        stream
            .play()
            .map_err(|e| Error::BackendError(format!("Failed to start stream: {}", e)))?;
        info!("Audio stream started on '{}'", self.device_name);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause stream on '{}': {}", self.device_name, e);
            }
            // Dropping the stream joins the audio thread and drops the callback
            drop(stream);
            if self.has_error() {
                warn!(
                    "Stream on '{}' reported {} error(s)",
                    self.device_name,
                    self.error_count.load(Ordering::SeqCst)
                );
            }
            debug!("Audio stream on '{}' closed", self.device_name);
        }
        Ok(())
    }

    fn cpu_load(&self) -> f64 {
        self.meter.load()
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Pick the cpal buffer size: an explicit frame count wins, otherwise the
/// suggested latency is converted to frames. Either is clamped into the
/// device's supported range.
pub fn choose_buffer_size(params: &StreamParameters, range: &SupportedBufferSize) -> BufferSize {
    let frames = match params.frames_per_buffer {
        Some(frames) => frames,
        None => match latency_frames(params.suggested_latency, params.sample_rate) {
            Some(frames) => frames,
            None => return BufferSize::Default,
        },
    };
    BufferSize::Fixed(clamp_frames(frames, range))
}

fn latency_frames(latency: Duration, sample_rate: u32) -> Option<u32> {
    let frames = latency.as_nanos() * u128::from(sample_rate) / 1_000_000_000;
    match u32::try_from(frames) {
        Ok(0) | Err(_) => None,
        Ok(frames) => Some(frames),
    }
}

fn clamp_frames(frames: u32, range: &SupportedBufferSize) -> u32 {
    match range {
        SupportedBufferSize::Range { min, max } if min <= max => frames.clamp(*min, *max),
        _ => frames,
    }
}

/// Reverse the byte order of every `width`-byte sample in `bytes`
#[cfg_attr(target_endian = "little", allow(dead_code))]
fn swap_sample_bytes(bytes: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for sample in bytes.chunks_exact_mut(width) {
        sample.reverse();
    }
}
