//! Real-time feed protocol
//!
//! [`StreamFeeder`] is the only code that runs on the backend's real-time
//! thread. Each invocation copies up to N frames from the file into the
//! caller's buffer and zero-pads whatever the file could not supply.
//!
//! **Real-time rules:** no allocation, no blocking lock, no panic, no logging.
//! I/O errors are parked on the shared [`FeedMonitor`] with `try_lock` and the
//! stream completes with silence.

use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Outcome of one feed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Buffer fully filled from the file; more data may remain
    Continue,
    /// Source exhausted (or failed); no further frames will be supplied
    Complete,
}

/// State shared between the feeder on the real-time thread and the owning
/// session.
///
/// Lock-free except for the error slot, which the feeder only ever touches
/// with `try_lock`.
#[derive(Debug, Default)]
pub struct FeedMonitor {
    complete: AtomicBool,
    frames_delivered: AtomicU64,
    failed: AtomicBool,
    error: Mutex<Option<io::Error>>,
}

impl FeedMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the feeder has reported [`FeedStatus::Complete`]
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Frames read from the file so far (padding excluded)
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::Relaxed)
    }

    /// True if an I/O error ended the stream early
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Take the recorded I/O error, if any.
    ///
    /// Only call from a non-real-time thread.
    pub fn take_error(&self) -> Option<io::Error> {
        match self.error.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn mark_complete(&self) {
        self.complete.store(true, Ordering::Release);
    }

    fn add_frames(&self, frames: u64) {
        self.frames_delivered.fetch_add(frames, Ordering::Relaxed);
    }

    fn record_error(&self, error: io::Error) {
        self.failed.store(true, Ordering::Release);
        if let Ok(mut slot) = self.error.try_lock() {
            if slot.is_none() {
                *slot = Some(error);
            }
        }
    }
}

/// File-backed frame source for the real-time callback.
///
/// `source` must be positioned at the first PCM byte and yield EOF at the end
/// of the data chunk (e.g. a [`Read::take`] of the data length).
pub struct StreamFeeder<R> {
    source: R,
    frame_bytes: usize,
    finished: bool,
    monitor: Arc<FeedMonitor>,
}

impl<R: Read> StreamFeeder<R> {
    /// Create a feeder for frames of `channel_count * bytes_per_sample` bytes.
    ///
    /// # Panics
    /// Panics if the frame size is zero; callers hold a validated descriptor.
    pub fn new(source: R, bytes_per_sample: u16, channel_count: u16, monitor: Arc<FeedMonitor>) -> Self {
        let frame_bytes = usize::from(bytes_per_sample) * usize::from(channel_count);
        assert!(frame_bytes > 0, "Frame size must be non-zero");
        Self {
            source,
            frame_bytes,
            finished: false,
            monitor,
        }
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn monitor(&self) -> &Arc<FeedMonitor> {
        &self.monitor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fill `buffer` with up to `frame_count` frames.
    ///
    /// The first `frame_count * frame_bytes` bytes of `buffer` are always
    /// written: file data first, zeros after. `frame_count` is clamped to the
    /// number of whole frames `buffer` can hold. Bytes past that region are
    /// left untouched.
    pub fn feed(&mut self, frame_count: usize, buffer: &mut [u8]) -> FeedStatus {
        let frame_count = frame_count.min(buffer.len() / self.frame_bytes);
        let wanted = frame_count * self.frame_bytes;
        let region = &mut buffer[..wanted];

        if self.finished {
            region.fill(0);
            return FeedStatus::Complete;
        }

        let mut filled = 0;
        while filled < wanted {
            match self.source.read(&mut region[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.monitor.record_error(e);
                    break;
                }
            }
        }

        // A trailing partial frame counts as silence
        let frames_read = filled / self.frame_bytes;
        region[frames_read * self.frame_bytes..].fill(0);
        self.monitor.add_frames(frames_read as u64);

        if frames_read < frame_count {
            self.finished = true;
            self.monitor.mark_complete();
            FeedStatus::Complete
        } else {
            FeedStatus::Continue
        }
    }

    /// Fill as many whole frames as `buffer` holds.
    pub fn feed_buffer(&mut self, buffer: &mut [u8]) -> FeedStatus {
        let frames = buffer.len() / self.frame_bytes;
        self.feed(frames, buffer)
    }
}
