//! Scriptable audio backend
//!
//! Devices and format support are configured up front. Opened streams never
//! run on their own; tests pull buffers through [`MockBackend::pump`] and
//! inspect the recorded lifecycle events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use openau_core::{
    AudioBackend, DeviceDescriptor, Error, FeedStatus, Result, StreamCallback, StreamHandle,
    StreamParameters,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Open { device: usize, sample_rate: u32 },
    Start,
    Close,
    CallbackDropped,
}

type EventLog = Arc<Mutex<Vec<MockEvent>>>;
type CallbackSlot = Arc<Mutex<Option<GuardedCallback>>>;

pub struct MockBackend {
    pub devices: Vec<DeviceDescriptor>,
    pub default_output: Option<usize>,
    /// Rates every device accepts
    pub supported_rates: Vec<u32>,
    pub fail_open: bool,
    pub fail_start: bool,
    events: EventLog,
    slot: CallbackSlot,
}

impl MockBackend {
    /// One stereo device at 44100 Hz accepting 44100 and 48000
    pub fn new() -> Self {
        Self {
            devices: vec![mock_device(0, "Mock Speakers", 2, 44100)],
            default_output: Some(0),
            supported_rates: vec![44100, 48000],
            fail_open: false,
            fail_start: false,
            events: Arc::new(Mutex::new(Vec::new())),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Invoke the stream callback once, as the audio thread would.
    /// Returns None if no stream is open or it has been closed.
    pub fn pump(&self, buffer: &mut [u8]) -> Option<FeedStatus> {
        let mut slot = self.slot.lock().unwrap();
        slot.as_mut().map(|guarded| guarded.call(buffer))
    }

    pub fn has_callback(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

pub fn mock_device(index: usize, name: &str, channels: u16, rate: u32) -> DeviceDescriptor {
    DeviceDescriptor {
        index,
        name: name.to_string(),
        host_api_name: "Mock".to_string(),
        max_input_channels: 0,
        max_output_channels: channels,
        default_sample_rate: rate,
        default_low_latency: Duration::from_millis(10),
        default_high_latency: Duration::from_millis(100),
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self.devices.clone())
    }

    fn default_input_device(&self) -> Option<usize> {
        None
    }

    fn default_output_device(&self) -> Option<usize> {
        self.default_output
    }

    fn is_format_supported(&self, device: &DeviceDescriptor, params: &StreamParameters) -> bool {
        params.channel_count <= device.max_output_channels
            && self.supported_rates.contains(&params.sample_rate)
    }

    fn open_stream(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParameters,
        callback: StreamCallback,
    ) -> Result<Box<dyn StreamHandle>> {
        let guarded = GuardedCallback {
            inner: callback,
            _guard: DropGuard(Arc::clone(&self.events)),
        };
        if self.fail_open {
            return Err(Error::BackendError("mock open failure".to_string()));
        }

        self.events.lock().unwrap().push(MockEvent::Open {
            device: device.index,
            sample_rate: params.sample_rate,
        });
        *self.slot.lock().unwrap() = Some(guarded);

        Ok(Box::new(MockStream {
            events: Arc::clone(&self.events),
            slot: Arc::clone(&self.slot),
            fail_start: self.fail_start,
        }))
    }
}

struct MockStream {
    events: EventLog,
    slot: CallbackSlot,
    fail_start: bool,
}

impl StreamHandle for MockStream {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(Error::BackendError("mock start failure".to_string()));
        }
        self.events.lock().unwrap().push(MockEvent::Start);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(MockEvent::Close);
        let callback = self.slot.lock().unwrap().take();
        drop(callback);
        Ok(())
    }

    fn cpu_load(&self) -> f64 {
        0.25
    }
}

struct GuardedCallback {
    inner: StreamCallback,
    _guard: DropGuard,
}

impl GuardedCallback {
    fn call(&mut self, buffer: &mut [u8]) -> FeedStatus {
        (self.inner)(buffer)
    }
}

struct DropGuard(EventLog);

impl Drop for DropGuard {
    fn drop(&mut self) {
        if let Ok(mut events) = self.0.lock() {
            events.push(MockEvent::CallbackDropped);
        }
    }
}
