//! Null (silent) output backend
//!
//! Provides a single virtual output device whose "hardware" is a plain
//! thread pulling buffers from the callback. Nothing is played; the pulled
//! audio is discarded. Used for headless playback and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::debug;

use super::load::{buffer_duration, CpuLoadMeter};
use super::{AudioBackend, DeviceDescriptor, StreamCallback, StreamHandle, StreamParameters};
use crate::descriptor::SampleFormat;
use crate::error::{Error, Result};
use crate::feeder::FeedStatus;
use crate::negotiate::STANDARD_SAMPLE_RATES;

const NULL_DEVICE_INDEX: usize = 0;

/// Capabilities of the virtual device
#[derive(Debug, Clone)]
pub struct NullBackendConfig {
    pub device_name: String,
    pub max_output_channels: u16,
    pub default_sample_rate: u32,
    /// Rates the device accepts; empty accepts any rate
    pub supported_rates: Vec<u32>,
    pub supported_formats: Vec<SampleFormat>,
    /// Frames per callback when the caller does not ask for a size
    pub frames_per_buffer: u32,
    /// Pace callbacks at the stream's sample rate instead of running flat out
    pub realtime: bool,
}

impl Default for NullBackendConfig {
    fn default() -> Self {
        Self {
            device_name: "Null Output".to_string(),
            max_output_channels: 8,
            default_sample_rate: 44100,
            supported_rates: STANDARD_SAMPLE_RATES.to_vec(),
            supported_formats: vec![
                SampleFormat::Int8,
                SampleFormat::Int16,
                SampleFormat::Int24,
                SampleFormat::Int32,
                SampleFormat::Float32,
            ],
            frames_per_buffer: 512,
            realtime: false,
        }
    }
}

/// Backend with one virtual output device
#[derive(Debug, Clone, Default)]
pub struct NullBackend {
    config: NullBackendConfig,
}

impl NullBackend {
    pub fn new(config: NullBackendConfig) -> Self {
        Self { config }
    }

    /// Null backend that consumes audio at the stream's real rate
    pub fn realtime() -> Self {
        Self::new(NullBackendConfig {
            realtime: true,
            ..NullBackendConfig::default()
        })
    }

    pub fn config(&self) -> &NullBackendConfig {
        &self.config
    }

    fn device(&self) -> DeviceDescriptor {
        let buffer = buffer_duration(
            self.config.frames_per_buffer as usize,
            self.config.default_sample_rate,
        );
        DeviceDescriptor {
            index: NULL_DEVICE_INDEX,
            name: self.config.device_name.clone(),
            host_api_name: "Null".to_string(),
            max_input_channels: 0,
            max_output_channels: self.config.max_output_channels,
            default_sample_rate: self.config.default_sample_rate,
            default_low_latency: buffer,
            default_high_latency: buffer * 4,
        }
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(vec![self.device()])
    }

    fn default_input_device(&self) -> Option<usize> {
        None
    }

    fn default_output_device(&self) -> Option<usize> {
        Some(NULL_DEVICE_INDEX)
    }

    fn is_format_supported(&self, device: &DeviceDescriptor, params: &StreamParameters) -> bool {
        device.index == NULL_DEVICE_INDEX
            && params.channel_count > 0
            && params.channel_count <= self.config.max_output_channels
            && self.config.supported_formats.contains(&params.sample_format)
            && (self.config.supported_rates.is_empty()
                || self.config.supported_rates.contains(&params.sample_rate))
    }

    fn open_stream(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParameters,
        callback: StreamCallback,
    ) -> Result<Box<dyn StreamHandle>> {
        if !self.is_format_supported(device, params) {
            return Err(Error::BackendError(format!(
                "null device cannot open {} channels of {} at {} Hz",
                params.channel_count, params.sample_format, params.sample_rate
            )));
        }

        let frames_per_buffer = params
            .frames_per_buffer
            .unwrap_or(self.config.frames_per_buffer)
            .max(1) as usize;

        debug!(
            "Null stream opened: {} frames per buffer, realtime={}",
            frames_per_buffer, self.config.realtime
        );

        Ok(Box::new(NullStream {
            callback: Some(callback),
            frames_per_buffer,
            frame_bytes: params.frame_bytes(),
            sample_rate: params.sample_rate,
            realtime: self.config.realtime,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            meter: Arc::new(CpuLoadMeter::new()),
        }))
    }
}

struct NullStream {
    callback: Option<StreamCallback>,
    frames_per_buffer: usize,
    frame_bytes: usize,
    sample_rate: u32,
    realtime: bool,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    meter: Arc<CpuLoadMeter>,
}

impl StreamHandle for NullStream {
    fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::InvalidState("null stream already started".to_string()));
        }
        let mut callback = self
            .callback
            .take()
            .ok_or_else(|| Error::InvalidState("null stream already closed".to_string()))?;

        let stop = Arc::clone(&self.stop);
        let meter = Arc::clone(&self.meter);
        let frames = self.frames_per_buffer;
        let budget = buffer_duration(frames, self.sample_rate);
        let realtime = self.realtime;
        let mut buffer = vec![0u8; frames * self.frame_bytes];

        let worker = thread::Builder::new()
            .name("openau-null-output".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                while !stop.load(Ordering::Acquire) {
                    let started = Instant::now();
                    let status = callback(&mut buffer);
                    meter.record(started.elapsed(), budget);

                    if status == FeedStatus::Complete {
                        break;
                    }
                    if realtime {
                        deadline += budget;
                        let now = Instant::now();
                        if deadline > now {
                            thread::sleep(deadline - now);
                        }
                    }
                }
            })
            .map_err(|e| Error::BackendError(format!("failed to spawn null output thread: {}", e)))?;

        self.worker = Some(worker);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        // Never started: the callback is still here
        self.callback = None;
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::BackendError("null output thread panicked".to_string()))?;
        }
        Ok(())
    }

    fn cpu_load(&self) -> f64 {
        self.meter.load()
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
