//! Device/format negotiation
//!
//! Confirms that a device can play a file as-is. There is no resampling: the
//! only rate ever opened is the file's own rate, and a device that cannot
//! serve it is a hard failure. The standard-rate table is probed for the
//! error report only.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{AudioBackend, DeviceDescriptor, OutputOptions, StreamParameters};
use crate::descriptor::{SampleFormat, StreamDescriptor};
use crate::error::{Error, Result};

/// Reference sample rates probed for device capability reports, ascending
pub const STANDARD_SAMPLE_RATES: [u32; 13] = [
    8000, 9600, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 88200, 96000, 192000,
];

/// Stream parameters agreed for a device
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedFormat {
    pub device_index: usize,
    pub device_name: String,
    pub params: StreamParameters,
    /// True when the device's default rate already matched the file
    pub uses_device_default_rate: bool,
}

/// Negotiate stream parameters for playing `descriptor` on `device`.
///
/// # Errors
/// - `UnsupportedChannels` if the device has too few output channels
/// - `UnsupportedDeviceFormat` if the device accepts the sample format at no
///   standard rate and not at the file's rate either
/// - `UnsupportedRate` if the device cannot serve the file's rate; carries the
///   standard rates it does support for this format
pub fn negotiate(
    backend: &dyn AudioBackend,
    descriptor: &StreamDescriptor,
    device: &DeviceDescriptor,
    options: &OutputOptions,
) -> Result<NegotiatedFormat> {
    if device.max_output_channels < descriptor.channel_count {
        return Err(Error::UnsupportedChannels {
            device: device.name.clone(),
            requested: descriptor.channel_count,
            available: device.max_output_channels,
        });
    }

    let params = StreamParameters {
        channel_count: descriptor.channel_count,
        sample_format: descriptor.sample_format,
        sample_rate: descriptor.sample_rate,
        suggested_latency: options.latency.pick(device),
        frames_per_buffer: options.frames_per_buffer,
    };

    if backend.is_format_supported(device, &params) {
        let uses_device_default_rate = device.default_sample_rate == descriptor.sample_rate;
        if uses_device_default_rate {
            debug!(
                "Device '{}' default rate {} Hz matches file",
                device.name, device.default_sample_rate
            );
        } else {
            info!(
                "Device '{}' defaults to {} Hz; opening at file rate {} Hz",
                device.name, device.default_sample_rate, descriptor.sample_rate
            );
        }
        return Ok(NegotiatedFormat {
            device_index: device.index,
            device_name: device.name.clone(),
            params,
            uses_device_default_rate,
        });
    }

    let supported = supported_standard_rates(
        backend,
        device,
        descriptor.channel_count,
        descriptor.sample_format,
    );
    warn!(
        "Device '{}' rejects {} Hz {} x{}; supported standard rates: {:?}",
        device.name,
        descriptor.sample_rate,
        descriptor.sample_format,
        descriptor.channel_count,
        supported
    );

    if supported.is_empty() {
        return Err(Error::UnsupportedDeviceFormat {
            device: device.name.clone(),
            sample_format: descriptor.sample_format,
        });
    }

    Err(Error::UnsupportedRate {
        device: device.name.clone(),
        requested: descriptor.sample_rate,
        supported,
    })
}

/// Standard rates `device` accepts for the given channel count and format,
/// in table order.
pub fn supported_standard_rates(
    backend: &dyn AudioBackend,
    device: &DeviceDescriptor,
    channel_count: u16,
    sample_format: SampleFormat,
) -> Vec<u32> {
    STANDARD_SAMPLE_RATES
        .iter()
        .copied()
        .filter(|&rate| {
            let probe = StreamParameters {
                channel_count,
                sample_format,
                sample_rate: rate,
                // Ignored by format probes
                suggested_latency: Duration::ZERO,
                frames_per_buffer: None,
            };
            backend.is_format_supported(device, &probe)
        })
        .collect()
}
