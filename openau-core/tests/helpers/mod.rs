//! Test helper modules for openau-core integration tests
//!
//! - `audio_generator`: hound-written WAV files with known contents
//! - `wav_builder`: hand-assembled RIFF bytes, including malformed ones
//! - `mock_backend`: scriptable backend that records stream lifecycle events

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_backend;
pub mod wav_builder;

pub use audio_generator::{generate_pcm16_wav, generate_pcm8_wav, ramp_sample};
pub use mock_backend::{MockBackend, MockEvent};
pub use wav_builder::WavBuilder;
