//! # openau core
//!
//! Streams uncompressed PCM from RIFF/WAVE files to an audio output:
//! - Bounds-checked chunk reading and container walking
//! - Format chunk validation into a [`StreamDescriptor`]
//! - Device/format negotiation against an [`AudioBackend`]
//! - Real-time safe frame feeding
//! - The [`Session`] that ties a file to one output stream

pub mod backend;
pub mod container;
pub mod descriptor;
pub mod devices;
pub mod error;
pub mod feeder;
pub mod negotiate;
pub mod session;

pub use backend::{
    AudioBackend, DeviceDescriptor, DeviceSelector, LatencyPreference, NullBackend,
    NullBackendConfig, OutputOptions, StreamCallback, StreamHandle, StreamParameters,
};
pub use container::{read_layout, DataRegion, WavLayout};
pub use descriptor::{SampleFormat, StreamDescriptor};
pub use devices::{DeviceEntry, DeviceReport};
pub use error::{Error, Result};
pub use feeder::{FeedMonitor, FeedStatus, StreamFeeder};
pub use negotiate::{negotiate, NegotiatedFormat, STANDARD_SAMPLE_RATES};
pub use session::{Session, SessionState};
