//! Device capability report
//!
//! Diagnostic listing of every device the backend exposes, with the standard
//! sample rates each accepts for 16-bit PCM at its full output channel count.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::backend::{AudioBackend, DeviceDescriptor};
use crate::descriptor::SampleFormat;
use crate::error::Result;
use crate::negotiate::supported_standard_rates;

/// Format used when probing rates for the report
const PROBE_FORMAT: SampleFormat = SampleFormat::Int16;

#[derive(Debug, Clone, Serialize)]
pub struct DeviceEntry {
    #[serde(flatten)]
    pub device: DeviceDescriptor,
    pub is_default_input: bool,
    pub is_default_output: bool,
    /// Standard rates accepted for 16-bit output; empty for input-only devices
    pub supported_rates: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub backend: String,
    pub devices: Vec<DeviceEntry>,
}

impl DeviceReport {
    /// Enumerate and probe every device of `backend`.
    pub fn collect(backend: &dyn AudioBackend) -> Result<Self> {
        let default_input = backend.default_input_device();
        let default_output = backend.default_output_device();

        let devices = backend
            .enumerate_devices()?
            .into_iter()
            .map(|device| {
                let supported_rates = if device.max_output_channels > 0 {
                    supported_standard_rates(
                        backend,
                        &device,
                        device.max_output_channels,
                        PROBE_FORMAT,
                    )
                } else {
                    Vec::new()
                };
                DeviceEntry {
                    is_default_input: default_input == Some(device.index),
                    is_default_output: default_output == Some(device.index),
                    supported_rates,
                    device,
                }
            })
            .collect();

        Ok(Self {
            backend: backend.name().to_string(),
            devices,
        })
    }

    pub fn default_output(&self) -> Option<&DeviceEntry> {
        self.devices.iter().find(|entry| entry.is_default_output)
    }

    /// Emit one info line per device
    pub fn log(&self) {
        info!("{} audio devices on {} backend", self.devices.len(), self.backend);
        for entry in &self.devices {
            info!("{}", entry);
        }
    }
}

impl fmt::Display for DeviceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.device;
        let mut tags = Vec::new();
        if self.is_default_input {
            tags.push("default input");
        }
        if self.is_default_output {
            tags.push("default output");
        }

        write!(f, "#{} {} [{}]", d.index, d.name, d.host_api_name)?;
        if !tags.is_empty() {
            write!(f, " ({})", tags.join(", "))?;
        }
        write!(
            f,
            ": in {} / out {} ch, default {} Hz, latency {:.1}-{:.1} ms",
            d.max_input_channels,
            d.max_output_channels,
            d.default_sample_rate,
            d.default_low_latency.as_secs_f64() * 1000.0,
            d.default_high_latency.as_secs_f64() * 1000.0
        )?;
        if !self.supported_rates.is_empty() {
            let rates: Vec<String> = self.supported_rates.iter().map(u32::to_string).collect();
            write!(f, ", rates {}", rates.join("/"))?;
        }
        Ok(())
    }
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend: {}", self.backend)?;
        if self.devices.is_empty() {
            return writeln!(f, "No audio devices found");
        }
        for entry in &self.devices {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
