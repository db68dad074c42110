//! Playback session
//!
//! A [`Session`] owns everything one playback needs: the file cursor, the
//! validated descriptor, the feeder, and (once started) the backend stream.
//! There is no process-wide state.
//!
//! **Lifecycle:** `Created → ParsingHeader → Streaming → Closed`. `open`
//! drives the first three synchronously; a session that exists and is not
//! closed is always `Streaming` with a validated descriptor.
//!
//! **Ownership of the file:** while idle, the feeder (and the file inside it)
//! belongs to the session and `feed` may be called directly. `start` moves
//! the feeder into the backend callback, so nothing else can touch the
//! cursor while the real-time thread is using it.

use std::fs::File;
use std::io::{self, BufReader, Read, Take};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::backend::{AudioBackend, DeviceSelector, OutputOptions, StreamCallback, StreamHandle};
use crate::container::{self, WavLayout};
use crate::descriptor::StreamDescriptor;
use crate::error::{Error, Result};
use crate::feeder::{FeedMonitor, FeedStatus, StreamFeeder};
use crate::negotiate::{self, NegotiatedFormat};

/// File source bounded to the data chunk
pub type DataSource = Take<BufReader<File>>;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    ParsingHeader,
    Streaming,
    Closed,
}

impl SessionState {
    fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, ParsingHeader)
                | (ParsingHeader, Streaming)
                | (ParsingHeader, Closed)
                | (Streaming, Closed)
        )
    }
}

/// An output stream currently driven by the backend
struct ActiveOutput {
    handle: Box<dyn StreamHandle>,
    format: NegotiatedFormat,
    device_default_rate: u32,
}

/// One file being played
pub struct Session {
    path: PathBuf,
    state: SessionState,
    layout: WavLayout,
    feeder: Option<StreamFeeder<DataSource>>,
    monitor: Arc<FeedMonitor>,
    output: Option<ActiveOutput>,
}

impl Session {
    /// Open `path` and parse its container up to the first PCM byte.
    ///
    /// # Errors
    /// `FileReadError` if the file cannot be opened, or any container parse
    /// error. No session exists after a failure.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state = SessionState::Created;

        let file = File::open(&path).map_err(|source| Error::FileReadError {
            path: path.clone(),
            source,
        })?;

        advance(&mut state, SessionState::ParsingHeader, &path);
        let (layout, input) = match container::read_layout(BufReader::new(file)) {
            Ok(parsed) => parsed,
            Err(e) => {
                advance(&mut state, SessionState::Closed, &path);
                warn!("Failed to parse {}: {}", path.display(), e);
                return Err(e);
            }
        };
        advance(&mut state, SessionState::Streaming, &path);

        let descriptor = layout.descriptor;
        let monitor = Arc::new(FeedMonitor::new());
        let feeder = StreamFeeder::new(
            input.take(layout.data.len),
            descriptor.bytes_per_sample,
            descriptor.channel_count,
            Arc::clone(&monitor),
        );

        info!(
            "Opened {}: {}, {} frames ({:.2}s)",
            path.display(),
            descriptor,
            layout.total_frames(),
            descriptor.frames_to_duration(layout.total_frames()).as_secs_f64()
        );

        Ok(Self {
            path,
            state,
            layout,
            feeder: Some(feeder),
            monitor,
            output: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn descriptor(&self) -> StreamDescriptor {
        self.layout.descriptor
    }

    pub fn layout(&self) -> &WavLayout {
        &self.layout
    }

    pub fn total_frames(&self) -> u64 {
        self.layout.total_frames()
    }

    pub fn duration(&self) -> Duration {
        self.layout.descriptor.frames_to_duration(self.total_frames())
    }

    /// True once an output stream is running
    pub fn is_started(&self) -> bool {
        self.output.is_some()
    }

    /// True once the feeder has reported completion
    pub fn is_complete(&self) -> bool {
        self.monitor.is_complete()
    }

    /// Frames read from the file so far
    pub fn frames_played(&self) -> u64 {
        self.monitor.frames_delivered()
    }

    /// Playback position derived from `frames_played`
    pub fn position(&self) -> Duration {
        self.layout.descriptor.frames_to_duration(self.frames_played())
    }

    /// Take the I/O error that ended streaming early, if any
    pub fn take_stream_error(&self) -> Option<io::Error> {
        self.monitor.take_error()
    }

    /// Negotiated output parameters while started
    pub fn negotiated_format(&self) -> Option<&NegotiatedFormat> {
        self.output.as_ref().map(|output| &output.format)
    }

    /// CPU load reported for the running stream
    pub fn stream_cpu_load(&self) -> Option<f64> {
        self.output.as_ref().map(|output| output.handle.cpu_load())
    }

    /// One-line description of the opened output
    pub fn output_summary(&self) -> Option<String> {
        self.output.as_ref().map(|output| {
            format!(
                "Output device: {} at {} Hz (device default sample rate: {} Hz)",
                output.format.device_name,
                output.format.params.sample_rate,
                output.device_default_rate
            )
        })
    }

    /// Pull up to `frame_count` frames directly, without a backend.
    ///
    /// # Errors
    /// `InvalidState` if the session is closed or its feeder was handed to a
    /// running stream.
    pub fn feed(&mut self, frame_count: usize, buffer: &mut [u8]) -> Result<FeedStatus> {
        self.ensure_streaming("feed")?;
        let feeder = self.feeder.as_mut().ok_or_else(|| {
            Error::InvalidState("feeder is owned by the running output stream".to_string())
        })?;
        Ok(feeder.feed(frame_count, buffer))
    }

    /// Start playback on the device picked by `selector` with default options.
    pub fn start(&mut self, backend: &dyn AudioBackend, selector: &DeviceSelector) -> Result<()> {
        self.start_with(backend, selector, &OutputOptions::default())
    }

    /// Negotiate a format with the selected device, open a stream whose
    /// callback owns the feeder, and start it.
    ///
    /// Failures up to and including negotiation leave the session idle and
    /// startable again. Once the feeder has been handed to the backend, a
    /// failure closes the session.
    pub fn start_with(
        &mut self,
        backend: &dyn AudioBackend,
        selector: &DeviceSelector,
        options: &OutputOptions,
    ) -> Result<()> {
        self.ensure_streaming("start")?;
        if self.output.is_some() || self.feeder.is_none() {
            return Err(Error::InvalidState("session already started".to_string()));
        }

        let devices = backend.enumerate_devices()?;
        let device = selector.resolve(backend, &devices)?;
        info!(
            "Selected {} device #{} '{}' ({})",
            backend.name(),
            device.index,
            device.name,
            device.host_api_name
        );

        let format = negotiate::negotiate(backend, &self.layout.descriptor, device, options)?;
        debug!("Negotiated output: {:?}", format.params);

        let mut feeder = match self.feeder.take() {
            Some(feeder) => feeder,
            None => return Err(Error::InvalidState("session already started".to_string())),
        };
        let callback: StreamCallback = Box::new(move |buffer: &mut [u8]| feeder.feed_buffer(buffer));

        let mut handle = match backend.open_stream(device, &format.params, callback) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to open output stream: {}", e);
                self.transition(SessionState::Closed);
                return Err(e);
            }
        };

        if let Err(e) = handle.start() {
            error!("Failed to start output stream: {}", e);
            if let Err(close_err) = handle.close() {
                warn!("Failed to close stream after start failure: {}", close_err);
            }
            self.transition(SessionState::Closed);
            return Err(e);
        }

        self.output = Some(ActiveOutput {
            handle,
            format,
            device_default_rate: device.default_sample_rate,
        });
        if let Some(summary) = self.output_summary() {
            info!("{}", summary);
        }
        Ok(())
    }

    /// Stop the output (if any), then release the file.
    ///
    /// Safe to call from any non-real-time thread, and more than once: a
    /// closed session ignores further calls.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            debug!("Session for {} already closed", self.path.display());
            return Ok(());
        }

        // Backend first: the callback owns the file while a stream runs
        let mut result = Ok(());
        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.handle.close() {
                error!("Failed to close output stream: {}", e);
                result = Err(e);
            }
        }
        self.feeder = None;
        self.transition(SessionState::Closed);

        info!(
            "Closed {} after {} of {} frames",
            self.path.display(),
            self.frames_played(),
            self.total_frames()
        );
        result
    }

    fn ensure_streaming(&self, operation: &str) -> Result<()> {
        if self.state != SessionState::Streaming {
            return Err(Error::InvalidState(format!(
                "cannot {} a session in state {:?}",
                operation, self.state
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        advance(&mut self.state, next, &self.path);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn advance(state: &mut SessionState, next: SessionState, path: &Path) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid session transition {:?} -> {:?}",
        state,
        next
    );
    debug!("Session {}: {:?} -> {:?}", path.display(), state, next);
    *state = next;
}
